//! Shared cancellation flag for playback and extraction.
//!
//! One token is handed to the extraction worker and kept by the timeline;
//! `stop` flips it and every checkpoint observes it on its next check.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;

/// Raised by [`CancellationToken::check_cancelled`] so callers can tell a
/// requested abort apart from a genuine failure after type erasure.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation cancelled at stage={stage}")]
pub struct Cancelled {
    pub stage: &'static str,
}

#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; safe from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check_cancelled(&self, stage: &'static str) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled { stage });
        }
        Ok(())
    }
}

/// True when the error chain bottoms out in a [`Cancelled`] checkpoint.
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<Cancelled>().is_some())
}
