//! Cooperative cancellation.
//!
//! A [`CancelToken`] is checked at the start of each top-level operation
//! (store load/save, each scope resolution). Work that has already started
//! on a single scope runs to completion.

use crate::error::{FestError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`FestError::Cancelled`] if cancellation was requested.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!(operation, "cancelled before start");
            Err(FestError::cancelled(operation))
        } else {
            Ok(())
        }
    }
}
