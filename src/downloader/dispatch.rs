//! Batch orchestration: read work items, dispatch one job per item, wait for all of them.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::Semaphore;

use crate::config::InputConfig;
use crate::error::{Error, Result};
use crate::tracker::{CompletionTicket, CompletionTracker};
use crate::types::{BatchResult, JobId, Mode, Outcome, OutcomeRecord, WorkItem};
use crate::utils::ensure_destination;
use crate::worklist::WorkListReader;

use super::Downloader;
use super::job::JobContext;

impl Downloader {
    /// Download every item of `items` into `destination`
    ///
    /// The destination is checked (and created) before anything is
    /// dispatched. Each stream element then becomes one job with exactly one
    /// terminal outcome: stream errors (e.g. malformed lines) are recorded as
    /// `error` without a request. Returns once every dispatched job is terminal.
    ///
    /// # Errors
    ///
    /// Only pre-flight failures are returned, as
    /// [`Error::DestinationUnavailable`]. Per-item failures are counted in the
    /// [`BatchResult`] and reported to the outcome sink.
    pub async fn run<S>(&self, items: S, destination: &Path, mode: Mode) -> Result<BatchResult>
    where
        S: Stream<Item = Result<WorkItem>> + Send,
    {
        ensure_destination(destination).await?;

        let tracker = CompletionTracker::new();
        let pending_limit = Arc::new(Semaphore::new(self.config.download.max_pending_jobs));
        let ctx = JobContext {
            transport: Arc::clone(&self.transport),
            locator: Arc::clone(&self.locator),
            sink: Arc::clone(&self.sink),
            request_limit: Arc::clone(&self.request_limit),
            cancel_token: self.cancel_token.clone(),
            destination_dir: Arc::from(destination),
            mode,
        };

        tracing::info!(
            destination = %destination.display(),
            mode = %mode,
            max_concurrent = self.config.download.max_concurrent_downloads,
            "Starting batch"
        );

        futures::pin_mut!(items);
        loop {
            // Backpressure: at most max_pending_jobs jobs between dispatch and outcome
            let permit = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                permit = Arc::clone(&pending_limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let next = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                next = items.next() => next,
            };
            let Some(next) = next else { break };

            let ticket = tracker.register();
            let id = self.allocate_job_id();
            match next {
                Ok(item) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        let outcome = ctx.run(id, item).await;
                        ticket.finish(outcome);
                        drop(permit);
                    });
                }
                Err(e) => {
                    self.record_unreadable(id, e, ticket);
                    drop(permit);
                }
            }
        }

        if self.cancel_token.is_cancelled() {
            tracing::info!(
                dispatched = tracker.dispatched(),
                "Cancellation requested, no further items will be dispatched"
            );
        }
        tracker.close();

        tracing::info!(
            dispatched = tracker.dispatched(),
            pending = tracker.pending(),
            "Waiting for downloads to complete"
        );
        tracker.wait().await;

        let summary = tracker.summary();
        tracing::info!(
            success = summary.success,
            skipped = summary.skipped,
            error = summary.error,
            cancelled = summary.cancelled,
            "All done"
        );
        Ok(summary)
    }

    /// Read the work list described by `input` and download it into `destination`
    ///
    /// # Errors
    ///
    /// Fails before dispatch with [`Error::Config`] (bad charset),
    /// [`Error::InputUnavailable`] or [`Error::DestinationUnavailable`].
    pub async fn run_file(
        &self,
        input: &InputConfig,
        destination: &Path,
        mode: Mode,
    ) -> Result<BatchResult> {
        let reader = WorkListReader::from_config(input).await?;
        tracing::info!(file = %input.file.display(), "Reading work list");
        self.run(reader.into_stream(), destination, mode).await
    }

    /// Run the input, destination and mode from this downloader's configuration
    pub async fn run_configured(&self) -> Result<BatchResult> {
        let config = Arc::clone(&self.config);
        self.run_file(&config.input, &config.download.destination, config.download.mode)
            .await
    }

    /// Record a stream element that never became a job (malformed line, read error)
    fn record_unreadable(&self, id: JobId, error: Error, ticket: CompletionTicket) {
        // A malformed line keeps its raw text as the identifier
        let (line, identifier) = match &error {
            Error::MalformedLine { line, content } => (*line, content.clone()),
            _ => (0, String::new()),
        };
        self.sink.record(&OutcomeRecord {
            job_id: id,
            line,
            identifier,
            destination: None,
            uri: None,
            outcome: Outcome::Error,
            detail: Some(error.to_string()),
            timestamp: Utc::now(),
        });
        ticket.finish(Outcome::Error);
    }
}
