//! Cancellation and shutdown coordination.

use tokio_util::sync::CancellationToken;

use super::Downloader;

impl Downloader {
    /// Request soft cancellation
    ///
    /// The running batch stops reading new items. Jobs that have not finished
    /// writing their file report `cancelled`; jobs past the final rename still
    /// report `success`. [`run`](Downloader::run) returns once every dispatched
    /// job is terminal. Cancellation is sticky for this instance.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            tracing::info!("Cancelling downloads");
        }
        self.cancel_token.cancel();
    }

    /// Whether [`cancel`](Downloader::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token that is cancelled together with this downloader
    ///
    /// Cancelling the returned token (or any clone of it) cancels the downloader.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Flush the outcome sink
    ///
    /// Call after the last [`run`](Downloader::run). Records arriving after
    /// shutdown may be dropped by buffering sinks.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating shutdown");
        self.sink.flush().await;
        tracing::info!("Shutdown complete");
    }

    /// Cancel this downloader when the process receives SIGINT or SIGTERM
    ///
    /// The listener stops when the downloader is cancelled by other means.
    pub fn cancel_on_signal(&self) -> tokio::task::JoinHandle<()> {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = wait_for_signal() => {
                    tracing::info!("Cancelling downloads, waiting for jobs in flight");
                    token.cancel();
                }
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                // Nothing to listen on; never fire
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
