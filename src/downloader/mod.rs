//! Core downloader implementation split into focused submodules.
//!
//! - [`dispatch`] - Batch orchestration: reading items, spawning jobs, waiting for completion
//! - [`job`] - Single-job lifecycle: destination, skip check, request, persist
//! - [`lifecycle`] - Cancellation and shutdown

mod dispatch;
mod job;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::locator::Locator;
use crate::sink::{JsonLinesSink, MultiSink, OutcomeSink, TracingSink};
use crate::transport::{HttpTransport, Transport};
use crate::types::JobId;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// One instance owns the shared HTTP transport, the request concurrency
/// limit and the outcome sink. [`run`](Downloader::run) may be called more
/// than once; [`shutdown`](Downloader::shutdown) flushes the sink when done.
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Shared HTTP client all jobs submit through
    pub(crate) transport: Arc<dyn Transport>,
    /// Identifier -> request URL
    pub(crate) locator: Arc<Locator>,
    /// Where terminal outcomes are recorded
    pub(crate) sink: Arc<dyn OutcomeSink>,
    /// Semaphore limiting requests in flight (respects max_concurrent_downloads)
    pub(crate) request_limit: Arc<Semaphore>,
    /// Soft cancellation for the current and future runs
    pub(crate) cancel_token: CancellationToken,
    /// Next job id to hand out
    pub(crate) next_job_id: Arc<AtomicU64>,
}

impl Downloader {
    /// Create a downloader with the production HTTP transport
    ///
    /// Outcomes go to [`TracingSink`], plus a [`JsonLinesSink`] when
    /// `config.events_file` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for invalid settings, or
    /// [`Error::Io`](crate::Error::Io) if the events file cannot be opened.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.http)?);

        let sink: Arc<dyn OutcomeSink> = match &config.events_file {
            Some(path) => {
                let json = JsonLinesSink::create(path).await?;
                tracing::info!(path = %path.display(), "Writing outcome records");
                Arc::new(
                    MultiSink::new()
                        .with(Arc::new(TracingSink))
                        .with(Arc::new(json)),
                )
            }
            None => Arc::new(TracingSink),
        };

        Self::with_parts(config, transport, sink)
    }

    /// Create a downloader around an existing transport and sink
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Result<Self> {
        config.validate()?;
        let locator = Locator::new(&config.endpoint)?;
        let request_limit = Arc::new(Semaphore::new(config.download.max_concurrent_downloads));

        Ok(Self {
            config: Arc::new(config),
            transport,
            locator: Arc::new(locator),
            sink,
            request_limit,
            cancel_token: CancellationToken::new(),
            next_job_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The outcome sink
    pub fn sink(&self) -> Arc<dyn OutcomeSink> {
        Arc::clone(&self.sink)
    }

    pub(crate) fn allocate_job_id(&self) -> JobId {
        JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed))
    }
}
