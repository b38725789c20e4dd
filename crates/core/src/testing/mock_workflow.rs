//! Mock scheduled workflow and clock for scheduler tests.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::scheduler::{Clock, ScheduledWorkflow};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// Workflow returning scripted results; succeeds once the script runs out.
#[derive(Debug, Default)]
pub struct MockWorkflow {
    results: Mutex<VecDeque<bool>>,
    panics: AtomicU32,
    runs: AtomicU32,
}

impl MockWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue results for the next runs.
    pub fn push_results(&self, results: impl IntoIterator<Item = bool>) {
        self.results.lock().unwrap().extend(results);
    }

    /// Make the next `count` runs panic instead of returning.
    pub fn panic_next_runs(&self, count: u32) {
        self.panics.store(count, Ordering::SeqCst);
    }

    pub fn run_count(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduledWorkflow for MockWorkflow {
    async fn run_workflow(&self) -> bool {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let should_panic = self
            .panics
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_panic {
            panic!("mock workflow panic");
        }
        self.results.lock().unwrap().pop_front().unwrap_or(true)
    }
}
