//! Scheduler state.

use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Scheduler configuration and status, shared with status queries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleState {
    pub run_time: String,
    pub check_interval_ms: u64,
    pub active: bool,
    pub next_run: Option<NaiveDateTime>,
    pub last_run: Option<NaiveDateTime>,
    pub last_success: Option<bool>,
    /// Attempts used by the last firing.
    pub last_attempts: u32,
    /// Day of the last firing; a day never fires twice.
    pub last_fired_date: Option<NaiveDate>,
    /// Attempts per firing; 1 disables the retry loop.
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

/// Handle to a [`ScheduleState`] shared between the scheduler loop and
/// readers. The lock is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct SharedScheduleState(Arc<RwLock<ScheduleState>>);

impl SharedScheduleState {
    pub fn new(state: ScheduleState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ScheduleState {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mutates the state in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut ScheduleState) -> R) -> R {
        match self.0.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
