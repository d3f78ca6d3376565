//! Cooperative cancellation for long-running simulation work.
//!
//! A [`CancelToken`] is cheap to clone and shared between the evaluator and
//! the blocking worker that runs the simulator. The worker polls
//! [`CancelToken::is_cancelled`] between ticks; the evaluator calls
//! [`CancelToken::cancel`] when the deadline fires. An optional deadline
//! instant lets the worker stop on its own even if the cancel call races
//! with the last few ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag with an optional wall-clock deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also reports cancellation once `budget` has elapsed.
    ///
    /// A budget too large to represent as an [`Instant`] means no deadline.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(budget),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Return a guard that cancels this token when dropped.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: self.clone(),
        }
    }
}

/// Cancels its token when dropped.
///
/// Held by the evaluation future so that abandoning the future (timeout,
/// caller drop) also stops the worker.
#[derive(Debug)]
pub struct CancelOnDrop {
    token: CancelToken,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
