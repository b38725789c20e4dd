//! Daily scheduler driving the workflow from a background task.
//!
//! The scheduler owns a single background loop. Each tick it compares the
//! clock against the next fire time, fires the workflow at most once per
//! calendar day, and recomputes the next fire time. Firings are awaited
//! inline, so scheduled runs never overlap each other.
//!
//! With a retry policy configured, a failed firing is retried after a fixed
//! delay until it succeeds or the attempts are exhausted. Exhaustion is
//! recorded and the loop moves on to the next day.

mod clock;
mod config;
mod error;
mod persist;
mod runner;
mod traits;
mod types;

pub use clock::{Clock, SystemClock};
pub use config::{ScheduleConfig, ScheduleRetryConfig};
pub use error::SchedulerError;
pub use persist::TomlSchedulePersister;
pub use runner::{next_fire_after, parse_run_time, Scheduler};
pub use traits::{SchedulePersister, ScheduledWorkflow};
pub use types::{ScheduleState, SharedScheduleState};
