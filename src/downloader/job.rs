//! Single-job lifecycle: resolve destination, apply the skip policy, request, persist.
//!
//! Every path through [`JobContext::run`] produces exactly one
//! [`OutcomeRecord`] and returns the matching [`Outcome`]; the caller
//! finishes the job's completion ticket with it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, TransportError};
use crate::locator::Locator;
use crate::policy::should_skip;
use crate::sink::OutcomeSink;
use crate::transport::{FetchedBody, Transport};
use crate::types::{DownloadJob, JobId, Mode, Outcome, OutcomeRecord, WorkItem};
use crate::utils::{partial_path, resolve_destination};

/// Shared state a job needs, cloned once per batch and shared by its jobs
#[derive(Clone)]
pub(super) struct JobContext {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) locator: Arc<Locator>,
    pub(super) sink: Arc<dyn OutcomeSink>,
    pub(super) request_limit: Arc<Semaphore>,
    pub(super) cancel_token: CancellationToken,
    pub(super) destination_dir: Arc<Path>,
    pub(super) mode: Mode,
}

/// What was resolved before the job ended, for the outcome record
#[derive(Default)]
struct Trail {
    destination: Option<PathBuf>,
    uri: Option<String>,
}

impl JobContext {
    /// Drive one work item to a terminal outcome and record it
    pub(super) async fn run(&self, id: JobId, item: WorkItem) -> Outcome {
        let mut trail = Trail::default();
        let (outcome, detail) = match self.execute(id, &item, &mut trail).await {
            Ok(outcome) => (outcome, None),
            Err(Error::Cancelled) => (Outcome::Cancelled, None),
            Err(e) => (Outcome::Error, Some(e.to_string())),
        };

        self.sink.record(&OutcomeRecord {
            job_id: id,
            line: item.line,
            identifier: item.identifier,
            destination: trail.destination,
            uri: trail.uri,
            outcome,
            detail,
            timestamp: Utc::now(),
        });
        outcome
    }

    async fn execute(&self, id: JobId, item: &WorkItem, trail: &mut Trail) -> Result<Outcome> {
        let destination = resolve_destination(&self.destination_dir, &item.identifier)?;
        trail.destination = Some(destination.clone());

        if should_skip(&destination, self.mode).await {
            return Ok(Outcome::Skipped);
        }

        let uri = self.locator.locate(&item.identifier)?;
        trail.uri = Some(uri.to_string());

        let job = DownloadJob {
            id,
            item: item.clone(),
            destination,
            uri,
        };
        self.download(&job).await?;
        Ok(Outcome::Success)
    }

    async fn download(&self, job: &DownloadJob) -> Result<()> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(Error::Cancelled),
            permit = self.request_limit.acquire() => permit.map_err(|_| Error::Cancelled)?,
        };

        tracing::debug!(job_id = job.id.0, uri = %job.uri, "Requesting");
        let fetched = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(Error::Cancelled),
            result = self.transport.get(&job.uri) => result?,
        };

        let partial = partial_path(&job.destination, job.id);
        let written = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(Error::Cancelled),
            result = write_body(fetched, &partial, &job.destination) => result,
        };

        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                remove_partial(&partial).await;
                return Err(e);
            }
        };

        // Once the body is fully on disk the rename is not interrupted, so a
        // reported cancellation never leaves a completed file behind
        if let Err(source) = tokio::fs::rename(&partial, &job.destination).await {
            remove_partial(&partial).await;
            return Err(Error::Write {
                path: job.destination.clone(),
                source,
            });
        }

        tracing::debug!(
            job_id = job.id.0,
            path = %job.destination.display(),
            bytes,
            "Saved"
        );
        Ok(())
    }
}

/// Stream a response body into `partial`, creating parent directories as needed.
///
/// A body shorter or longer than the announced length is an error.
async fn write_body(fetched: FetchedBody, partial: &Path, destination: &Path) -> Result<u64> {
    let write_error = |source: std::io::Error| Error::Write {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = partial.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    let file = tokio::fs::File::create(partial).await.map_err(write_error)?;
    let mut out = tokio::io::BufWriter::new(file);

    let FetchedBody {
        content_length,
        mut body,
    } = fetched;
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await.map_err(write_error)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(write_error)?;

    if let Some(expected) = content_length {
        if written != expected {
            return Err(TransportError::Incomplete {
                received: written,
                expected,
            }
            .into());
        }
    }
    Ok(written)
}

async fn remove_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
        }
    }
}
