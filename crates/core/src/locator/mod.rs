//! Artifact locator.
//!
//! Polls a primary download directory and a list of fallback directories for
//! the spreadsheet produced by the extraction process. The producer writes
//! asynchronously, so every candidate is filtered for transient names,
//! freshness and readability before it is handed out.
//!
//! Ranking: anything in the primary directory beats anything in a fallback
//! directory; within a tier the most recently created file wins.

mod config;
mod error;
mod fs_locator;
mod info;
mod traits;
mod types;

pub use config::LocatorConfig;
pub use error::LocatorError;
pub use fs_locator::{is_transient_name, select_candidates, FsArtifactLocator};
pub use info::{artifact_info, ArtifactInfo};
pub use traits::ArtifactLocator;
pub use types::{ArtifactCandidate, CandidateSource, LocatedArtifact};
