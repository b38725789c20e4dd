//! Backup copies of pipeline artifacts and retention cleanup.

mod config;
mod error;
mod store;

pub use config::BackupConfig;
pub use error::BackupError;
pub use store::{backup_file_name, cleanup_older_than, BackupRecord, BackupStore};
