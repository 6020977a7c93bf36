//! # commons-dl
//!
//! Concurrent bulk downloader for file-hosting endpoints such as Wikimedia
//! Commons' `Special:FilePath`.
//!
//! A batch reads a line-delimited work list, turns every line into a request
//! URL, and downloads the files concurrently into a destination directory.
//! Each work item ends in exactly one terminal outcome (`success`, `skipped`,
//! `error` or `cancelled`), reported to an [`OutcomeSink`], and the batch call
//! returns once every dispatched item is terminal.
//!
//! ## Quick Start
//!
//! ```no_run
//! use commons_dl::{Config, Downloader, Mode};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.input.file = PathBuf::from("files.csv");
//!     config.download.destination = PathBuf::from("downloads");
//!     config.download.mode = Mode::Resume;
//!
//!     let downloader = Downloader::new(config).await?;
//!     let summary = downloader.run_configured().await?;
//!     downloader.shutdown().await;
//!
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batch orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Identifier to request URL mapping
pub mod locator;
/// Subscriber setup for the binary
pub mod logging;
/// Existing-file policy
pub mod policy;
/// Outcome reporting
pub mod sink;
/// Completion tracking for dispatched jobs
pub mod tracker;
/// HTTP transport abstraction
pub mod transport;
/// Core types
pub mod types;
/// Destination path helpers
pub mod utils;
/// Work list reading
pub mod worklist;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, EndpointConfig, HttpConfig, InputConfig};
pub use downloader::Downloader;
pub use error::{Error, Result, TransportError};
pub use locator::Locator;
pub use sink::{JsonLinesSink, MemorySink, MultiSink, OutcomeSink, TracingSink};
pub use tracker::{CompletionTicket, CompletionTracker};
pub use transport::{HttpTransport, Transport};
pub use types::{BatchResult, DownloadJob, JobId, Mode, Outcome, OutcomeRecord, WorkItem};
pub use worklist::WorkListReader;

/// Run a configured batch, cancelling it on SIGINT/SIGTERM, then shut down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use commons_dl::{Config, Downloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Downloader::new(Config::default()).await?;
///     let summary = run_with_shutdown(&downloader).await?;
///     println!("{}", summary);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: &Downloader) -> Result<BatchResult> {
    let signals = downloader.cancel_on_signal();
    let result = downloader.run_configured().await;
    signals.abort();
    downloader.shutdown().await;
    result
}
