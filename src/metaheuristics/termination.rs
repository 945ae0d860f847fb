//! Stopping rules shared by the local search solvers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The step limit was reached
    StepLimit,
    /// The wall-clock deadline expired
    TimeLimit,
    /// The caller cancelled the search
    Cancelled,
    /// The solver stopped improving, or had nothing to search
    Converged,
}

/// Shared cancellation flag.
///
/// Clones share state; cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Returns true once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Completes when the handle is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Step limit, deadline and cancellation flag of one search.
#[derive(Debug, Clone, Default)]
pub struct Termination {
    max_steps: Option<usize>,
    deadline: Option<Instant>,
    cancel: CancelHandle,
}

impl Termination {
    /// No limits; only cancellation stops the search.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops after `max_steps` steps.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Stops at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stops `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Uses `cancel` as the cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Step limit, if any.
    #[must_use]
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// Deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation flag.
    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Reason to stop after `steps` completed steps, if any. Cancellation
    /// wins over the deadline, which wins over the step limit.
    #[must_use]
    pub fn check(&self, steps: usize) -> Option<TerminationReason> {
        if self.cancel.is_cancelled() {
            Some(TerminationReason::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(TerminationReason::TimeLimit)
        } else if self.max_steps.is_some_and(|m| steps >= m) {
            Some(TerminationReason::StepLimit)
        } else {
            None
        }
    }
}
