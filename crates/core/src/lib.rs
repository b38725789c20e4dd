//! Orchestration and resilience core for the report relay.
//!
//! Triggers an external extraction, finds the spreadsheet it writes, hands it
//! to a transform, uploads the result to a document library and keeps
//! backups. A daily scheduler drives the whole run.

pub mod backup;
pub mod config;
pub mod date_range;
pub mod extraction;
pub mod locator;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod testing;
pub mod transform;
pub mod upload;

pub use config::{
    load_config, load_config_from_str, save_config, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use date_range::{DateRange, DateRangeError};
pub use orchestrator::{
    Orchestrator, RunReport, SystemStatus, UploadStatus, WorkflowError, WorkflowStep,
};
pub use scheduler::{Scheduler, SchedulerError};
