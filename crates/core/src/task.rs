//! Progress reporting and cooperative cancellation for long-running work
//!
//! Loading, full-document search and saving all walk the document page by
//! page. They report a [`Progress`] after each page and, where cancellable,
//! check a [`CancellationToken`] before starting the next one.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Pages processed so far out of the total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion in `0.0..=1.0`; an empty task counts as complete
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Callback receiving progress updates
pub type ProgressCallback<'a> = &'a mut dyn FnMut(Progress);

/// Callback that ignores progress
pub fn ignore_progress(_: Progress) {}

/// Cancellation token for cooperative task cancellation
///
/// Clones share the same state, so a caller can keep one clone and hand
/// another to the running task.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Make the token reusable; clones are reset too
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}
