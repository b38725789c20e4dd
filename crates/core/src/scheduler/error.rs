//! Error types for the scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid run time '{0}', expected HH:MM")]
    InvalidRunTime(String),

    #[error("Scheduler is already active")]
    AlreadyActive,

    #[error("Scheduler is not active")]
    NotActive,

    #[error("Failed to persist schedule: {0}")]
    Persist(String),
}
