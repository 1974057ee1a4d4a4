//! Cooperative cancellation

use crate::error::{HpssError, HpssResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancel flag, checked once per STFT frame.
///
/// Clones share the same flag, so a host can hand one clone to a worker
/// thread and keep the other to request cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested
    #[inline]
    pub fn check(&self) -> HpssResult<()> {
        if self.is_cancelled() {
            Err(HpssError::Cancelled)
        } else {
            Ok(())
        }
    }
}
