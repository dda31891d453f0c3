//! Cooperative cancellation shared by the driver and its stages.
//!
//! A `CancelToken` is a cheap clonable handle to one flag. Stages observe it
//! between items and inside every queue wait; anyone holding a clone (the
//! driver, a Ctrl-C handler, a failing stage) can trip it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, one-way cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("Cancellation requested");
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Guard that trips the token if the current thread unwinds while it is held.
    pub fn cancel_on_panic(&self) -> CancelOnPanic {
        CancelOnPanic {
            token: self.clone(),
        }
    }
}

/// See [`CancelToken::cancel_on_panic`].
#[must_use = "the token is only tripped while the guard is alive"]
pub struct CancelOnPanic {
    token: CancelToken,
}

impl Drop for CancelOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Stage thread panicked, cancelling run");
            self.token.cancel();
        }
    }
}
