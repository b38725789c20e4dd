//! Seams used by the scheduler.

use async_trait::async_trait;

use super::error::SchedulerError;

/// The work fired by the scheduler.
#[async_trait]
pub trait ScheduledWorkflow: Send + Sync {
    /// Runs the workflow once. Returns whether it succeeded.
    async fn run_workflow(&self) -> bool;
}

/// Stores a changed run time so it survives a restart.
pub trait SchedulePersister: Send + Sync {
    fn persist_run_time(&self, run_time: &str) -> Result<(), SchedulerError>;
}
