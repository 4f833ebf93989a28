//! Cooperative cancellation flag shared between the worker and the front end.
//!
//! `CancelToken` wraps an `Arc<AtomicBool>` but exposes only the two
//! operations that matter: [`CancelToken::cancel`] (called from the Ctrl-C
//! handler or any other thread) and [`CancelToken::is_cancelled`] (checked by
//! the engine between operations).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cheaply-clonable cancellation flag.
///
/// Create one with [`CancelToken::new`] and clone it for every party that
/// needs to observe or request cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
