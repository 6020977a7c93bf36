//! Core types for commons-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::{Error, Result};

/// Identifier assigned to every dispatched work item, in dispatch order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One identifier to download, derived from one input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// Remote file name, also used as the relative destination path
    pub identifier: String,
    /// 1-based line number in the input (0 when the item did not come from a file)
    pub line: u64,
}

impl WorkItem {
    /// Create a work item that did not come from an input file
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            line: 0,
        }
    }

    /// Extract the identifier from a raw line: everything before the last `delimiter`
    ///
    /// Trailing metadata after the delimiter is discarded.
    ///
    /// ```
    /// use commons_dl::WorkItem;
    ///
    /// let item = WorkItem::parse("Cat, sitting.jpg,1024", 1, ',').unwrap();
    /// assert_eq!(item.identifier, "Cat, sitting.jpg");
    /// assert!(WorkItem::parse("no-delimiter.jpg", 2, ',').is_err());
    /// ```
    pub fn parse(line: &str, line_number: u64, delimiter: char) -> Result<Self> {
        match line.rfind(delimiter) {
            Some(idx) => Ok(Self {
                identifier: line[..idx].to_string(),
                line: line_number,
            }),
            None => Err(Error::MalformedLine {
                line: line_number,
                content: line.to_string(),
            }),
        }
    }
}

/// Existing-file handling for the whole run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Skip items whose destination file already exists
    #[default]
    Resume,
    /// Always download, overwriting existing files
    Restart,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Resume => f.write_str("resume"),
            Mode::Restart => f.write_str("restart"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "resume" => Ok(Mode::Resume),
            "restart" => Ok(Mode::Restart),
            other => Err(Error::config(
                format!("unknown mode '{}', expected resume or restart", other),
                "mode",
            )),
        }
    }
}

/// Terminal classification of a work item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Response written to the destination
    Success,
    /// Destination already present in resume mode
    Skipped,
    /// Malformed input, bad identifier, transport or write failure
    Error,
    /// Stopped before completion
    Cancelled,
}

impl Outcome {
    /// Lowercase name used in logs and records
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Skipped => "skipped",
            Outcome::Error => "error",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime unit of work: a work item with its resolved destination and request URL
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Dispatch identifier
    pub id: JobId,
    /// The work item being downloaded
    pub item: WorkItem,
    /// Where the response body ends up
    pub destination: PathBuf,
    /// The request issued for this item
    pub uri: Url,
}

/// One audit record per work item, emitted when it becomes terminal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Dispatch identifier
    pub job_id: JobId,
    /// Input line number (0 if not from a file)
    pub line: u64,
    /// Work item identifier (empty for malformed lines)
    pub identifier: String,
    /// Resolved destination, when resolution got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Request URL, when one was built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Terminal outcome
    pub outcome: Outcome,
    /// Error or skip detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
}

/// Per-outcome counts for a finished batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Items written successfully
    pub success: u64,
    /// Items skipped because the destination existed
    pub skipped: u64,
    /// Items that failed
    pub error: u64,
    /// Items cancelled before completion
    pub cancelled: u64,
}

impl BatchResult {
    /// Total number of terminal items
    pub fn total(&self) -> u64 {
        self.success + self.skipped + self.error + self.cancelled
    }

    /// Count for a single outcome
    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Success => self.success,
            Outcome::Skipped => self.skipped,
            Outcome::Error => self.error,
            Outcome::Cancelled => self.cancelled,
        }
    }

    /// True when nothing failed or was cancelled
    pub fn is_clean(&self) -> bool {
        self.error == 0 && self.cancelled == 0
    }
}

impl std::fmt::Display for BatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} total: {} success, {} skipped, {} error, {} cancelled",
            self.total(),
            self.success,
            self.skipped,
            self.error,
            self.cancelled
        )
    }
}
