//! Trait definitions for the locator module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::LocatorError;
use super::types::LocatedArtifact;

/// Finds the artifact written by the extraction process.
#[async_trait]
pub trait ArtifactLocator: Send + Sync {
    /// Returns the name of this locator implementation.
    fn name(&self) -> &str;

    /// Polls until a usable artifact shows up or `max_wait` elapses.
    ///
    /// `pattern`, when given, must be contained in the file name
    /// (case-insensitive).
    async fn locate(
        &self,
        max_wait: Duration,
        pattern: Option<&str>,
    ) -> Result<LocatedArtifact, LocatorError>;

    /// Returns true once size and modification time stop changing.
    ///
    /// This is a heuristic. A producer that pauses longer than the check
    /// window will still look finished.
    async fn wait_for_stability(&self, path: &Path, max_wait: Duration) -> bool;
}
