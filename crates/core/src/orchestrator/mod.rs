//! Workflow orchestrator.
//!
//! One run walks seven steps in a fixed order:
//! 1. **validation**: configuration and date range
//! 2. **extraction**: external script, with bounded retry
//! 3. **settle**: fixed delay for the producer to finish writing
//! 4. **file_detection**: poll for the artifact
//! 5. **data_processing**: delegated transform
//! 6. **upload**: best effort, a failure is only a warning
//! 7. **backup**: copies of both artifacts, logged only
//!
//! Every trigger path goes through the same [`RunGuard`], so at most one
//! run executes at a time.

mod config;
mod guard;
mod runner;
mod types;

pub use config::WorkflowConfig;
pub use guard::{RunGuard, RunToken};
pub use runner::Orchestrator;
pub use types::{
    CompletionCallback, LastRun, ProgressCallback, RunProgress, RunReport, SystemStatus,
    UploadStatus, WorkflowError, WorkflowRun, WorkflowStep, TOTAL_STEPS,
};
