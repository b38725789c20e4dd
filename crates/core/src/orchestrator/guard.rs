//! Exclusive-run guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::metrics::RUN_IN_PROGRESS;

/// Single-slot lock shared by every trigger path (scheduled, manual,
/// processing-only).
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot, or returns `None` when a run holds it.
    pub fn try_acquire(&self) -> Option<RunToken> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        RUN_IN_PROGRESS.set(1);
        Some(RunToken {
            running: Arc::clone(&self.running),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Held for the duration of a run. Dropping it releases the slot on every
/// exit path, panics included.
#[derive(Debug)]
pub struct RunToken {
    running: Arc<AtomicBool>,
}

impl Drop for RunToken {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        RUN_IN_PROGRESS.set(0);
    }
}
