//! Outcome sinks: append-only audit trail of every work item's terminal outcome
//!
//! Sinks are observability only. `record` must return quickly and must not
//! fail the caller; slow I/O happens on a background task.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::types::{Outcome, OutcomeRecord};

/// Receives one record per work item when it becomes terminal
#[async_trait::async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Record an outcome. Must not block on I/O.
    fn record(&self, record: &OutcomeRecord);

    /// Flush buffered records. Called once after the batch completes.
    async fn flush(&self) {}
}

/// Emits each record as a structured `tracing` event on target `commons_dl::outcome`
///
/// Successes log at INFO, errors at WARN, skips and cancellations at DEBUG.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl OutcomeSink for TracingSink {
    fn record(&self, record: &OutcomeRecord) {
        let destination = record
            .destination
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let uri = record.uri.as_deref().unwrap_or_default();
        let detail = record.detail.as_deref().unwrap_or_default();

        match record.outcome {
            Outcome::Success => tracing::info!(
                target: "commons_dl::outcome",
                job_id = record.job_id.0,
                line = record.line,
                identifier = %record.identifier,
                destination = %destination,
                uri = %uri,
                status = "success",
                "Downloaded"
            ),
            Outcome::Error => tracing::warn!(
                target: "commons_dl::outcome",
                job_id = record.job_id.0,
                line = record.line,
                identifier = %record.identifier,
                destination = %destination,
                uri = %uri,
                status = "error",
                detail = %detail,
                "Download failed"
            ),
            Outcome::Skipped => tracing::debug!(
                target: "commons_dl::outcome",
                job_id = record.job_id.0,
                line = record.line,
                identifier = %record.identifier,
                destination = %destination,
                status = "skipped",
                "Skipped existing file"
            ),
            Outcome::Cancelled => tracing::debug!(
                target: "commons_dl::outcome",
                job_id = record.job_id.0,
                line = record.line,
                identifier = %record.identifier,
                destination = %destination,
                uri = %uri,
                status = "cancelled",
                "Download cancelled"
            ),
        }
    }
}

/// Appends one JSON object per record to a file
///
/// Records go through an unbounded channel to a writer task, so `record`
/// never waits on the disk. [`flush`](OutcomeSink::flush) closes the channel
/// and waits for the writer to drain it.
pub struct JsonLinesSink {
    tx: Mutex<Option<mpsc::UnboundedSender<OutcomeRecord>>>,
    writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    path: PathBuf,
}

impl JsonLinesSink {
    /// Open (append) `path` and start the writer task
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_records(path.to_path_buf(), file, rx));
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            writer: tokio::sync::Mutex::new(Some(writer)),
            path: path.to_path_buf(),
        })
    }

    /// File the records are written to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_records(
    path: PathBuf,
    file: tokio::fs::File,
    mut rx: mpsc::UnboundedReceiver<OutcomeRecord>,
) {
    let mut out = tokio::io::BufWriter::new(file);
    let mut failed = false;
    while let Some(record) = rx.recv().await {
        if failed {
            continue;
        }
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize outcome record");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = out.write_all(&line).await {
            // Keep draining so senders never notice
            tracing::error!(path = %path.display(), error = %e, "Failed to write outcome log");
            failed = true;
        }
    }
    if !failed {
        if let Err(e) = out.flush().await {
            tracing::error!(path = %path.display(), error = %e, "Failed to flush outcome log");
        }
    }
}

#[async_trait::async_trait]
impl OutcomeSink for JsonLinesSink {
    fn record(&self, record: &OutcomeRecord) {
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(record.clone()).is_err() {
                    tracing::warn!(path = %self.path.display(), "Outcome log writer has stopped");
                }
            }
            None => {
                tracing::warn!(
                    path = %self.path.display(),
                    job_id = record.job_id.0,
                    "Outcome recorded after flush, dropping"
                );
            }
        }
    }

    async fn flush(&self) {
        // Dropping the sender ends the writer loop once the queue is drained
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "Outcome log writer task failed");
            }
        }
    }
}

/// Forwards every record to several sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl MultiSink {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl OutcomeSink for MultiSink {
    fn record(&self, record: &OutcomeRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }

    async fn flush(&self) {
        for sink in &self.sinks {
            sink.flush().await;
        }
    }
}

/// Keeps records in memory; useful for embedding and tests
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records so far, in arrival order
    pub fn records(&self) -> Vec<OutcomeRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records for one identifier
    pub fn for_identifier(&self, identifier: &str) -> Vec<OutcomeRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.identifier == identifier)
            .collect()
    }
}

#[async_trait::async_trait]
impl OutcomeSink for MemorySink {
    fn record(&self, record: &OutcomeRecord) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}
