//! Completion tracking: a growing wait group with one ticket per dispatched job
//!
//! Every dispatched job holds exactly one [`CompletionTicket`]. Finishing the
//! ticket tallies the job's [`Outcome`] and decrements the pending count;
//! since `finish` consumes the ticket, a job cannot report twice. A ticket that
//! is dropped unfinished (panicked or aborted task) reports
//! [`Outcome::Cancelled`], so the wait can never hang on a lost job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

use crate::types::{BatchResult, Outcome};

struct Inner {
    dispatched: AtomicU64,
    // Registered jobs not yet terminal, plus one while the tracker is open.
    // Whoever takes it to zero wakes the waiters.
    outstanding: AtomicU64,
    closed: AtomicBool,
    success: AtomicU64,
    skipped: AtomicU64,
    error: AtomicU64,
    cancelled: AtomicU64,
    notify: Notify,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            outstanding: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            success: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            error: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }
}

impl Inner {
    fn is_done(&self) -> bool {
        self.outstanding.load(Ordering::Acquire) == 0
    }

    fn release(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "completion tracker went negative");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    fn complete(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.success,
            Outcome::Skipped => &self.skipped,
            Outcome::Error => &self.error,
            Outcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.release();
    }
}

/// Shared counter of dispatched jobs that have not reached a terminal outcome
#[derive(Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<Inner>,
}

impl CompletionTracker {
    /// Create an empty, open tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more dispatched job
    pub fn register(&self) -> CompletionTicket {
        debug_assert!(
            !self.inner.closed.load(Ordering::Acquire),
            "register after close"
        );
        self.inner.dispatched.fetch_add(1, Ordering::Relaxed);
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        CompletionTicket {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    /// Declare that no more jobs will be registered. Idempotent.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.release();
        }
    }

    /// Jobs registered so far
    pub fn dispatched(&self) -> u64 {
        self.inner.dispatched.load(Ordering::Relaxed)
    }

    /// Jobs registered but not yet terminal
    pub fn pending(&self) -> u64 {
        let closed = self.inner.closed.load(Ordering::Acquire);
        let outstanding = self.inner.outstanding.load(Ordering::Acquire);
        if closed {
            outstanding
        } else {
            outstanding.saturating_sub(1)
        }
    }

    /// Wait until the tracker is closed and every registered job is terminal
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a notify between the check
            // and the await is not lost
            notified.as_mut().enable();
            if self.inner.is_done() {
                return;
            }
            notified.await;
        }
    }

    /// Per-outcome counts so far
    pub fn summary(&self) -> BatchResult {
        BatchResult {
            success: self.inner.success.load(Ordering::Relaxed),
            skipped: self.inner.skipped.load(Ordering::Relaxed),
            error: self.inner.error.load(Ordering::Relaxed),
            cancelled: self.inner.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// A dispatched job's single right to decrement the tracker
#[must_use = "a ticket must be finished, or the job counts as cancelled when dropped"]
pub struct CompletionTicket {
    inner: Option<Arc<Inner>>,
}

impl CompletionTicket {
    /// Record the job's terminal outcome
    pub fn finish(mut self, outcome: Outcome) {
        if let Some(inner) = self.inner.take() {
            inner.complete(outcome);
        }
    }
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            tracing::warn!("Job dropped without reporting an outcome, counting as cancelled");
            inner.complete(Outcome::Cancelled);
        }
    }
}
