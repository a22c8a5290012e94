//! Cooperative cancellation for workers.
//!
//! Each worker holds a `CancelToken`; the manager keeps a clone so `delete`
//! can request cancellation. The worker observes the flag at attempt-loop
//! boundaries and inside the tool's progress callback, then stops by
//! returning a distinguished cancelled result rather than an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancel flag. Cheap to clone; requesting cancellation is idempotent
/// and infallible.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
