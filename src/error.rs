//! Error types for commons-dl
//!
//! Errors fall into two groups:
//! - **Pre-flight errors** (configuration, unreadable input, unusable destination)
//!   abort the whole run before anything is dispatched.
//! - **Per-job errors** (malformed line, locator, unsafe path, transport, write)
//!   are contained to one work item and surface as an `error` outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for commons-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for commons-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "charset")
        key: Option<String>,
    },

    /// The input work list could not be opened
    #[error("could not open input file {}: {source}", .path.display())]
    InputUnavailable {
        /// Path of the input file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The destination directory is missing and cannot be created, or is not writable
    #[error("destination {} is unavailable: {reason}", .path.display())]
    DestinationUnavailable {
        /// The destination directory
        path: PathBuf,
        /// Why the directory cannot be used
        reason: String,
    },

    /// An input line carries no delimiter
    #[error("malformed line {line}: no delimiter in {content:?}")]
    MalformedLine {
        /// 1-based line number in the input file
        line: u64,
        /// The raw line content
        content: String,
    },

    /// The identifier cannot be turned into a request URL
    #[error("cannot build request for {identifier:?}: {reason}")]
    Locator {
        /// The offending identifier
        identifier: String,
        /// Why the identifier was rejected
        reason: String,
    },

    /// The identifier would resolve outside the destination directory
    #[error("unsafe destination for {identifier:?}: {reason}")]
    UnsafePath {
        /// The offending identifier
        identifier: String,
        /// Why the identifier was rejected
        reason: String,
    },

    /// Network, DNS, timeout or HTTP status failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local filesystem failure while persisting a response body
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// The file being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The job was cancelled before it completed
    #[error("cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether this error aborts the whole run rather than a single job
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::InputUnavailable { .. } | Error::DestinationUnavailable { .. }
        )
    }
}

/// Failures reported by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS failure, TLS failure)
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or body read exceeded the configured timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The body ended before the announced `Content-Length`
    #[error("body ended after {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },

    /// Any other request or body failure
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}
