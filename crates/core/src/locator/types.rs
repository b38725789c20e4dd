//! Types produced by the locator.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Which kind of directory a candidate was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Primary,
    Fallback,
}

/// A file seen during one poll cycle.
#[derive(Debug, Clone)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub source: CandidateSource,
    /// Time since the file was created (or last modified when the
    /// filesystem does not record creation time).
    pub age: Duration,
    pub size: u64,
    pub transient: bool,
}

impl ArtifactCandidate {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The winner of a successful `locate` call.
#[derive(Debug, Clone, Serialize)]
pub struct LocatedArtifact {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub source: CandidateSource,
    pub size: u64,
    pub age: Duration,
    /// Number of scans performed, including the successful one.
    pub polls: u32,
    pub elapsed: Duration,
}
