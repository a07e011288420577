//! Cooperative cancellation for long-running catalog loads
//!
//! Bulk loads check the token between rows and stop early. A cancelled
//! bulk load leaves its cache in a known-incomplete state so the next
//! access retries the fetch.

use crate::{Result, StelaError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag handed into every cache operation that may
/// perform I/O
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next check point
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Check point: errors with `StelaError::Cancelled` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StelaError::Cancelled)
        } else {
            Ok(())
        }
    }
}
