//! Filesystem-backed artifact locator.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::LocatorConfig;
use super::error::LocatorError;
use super::traits::ArtifactLocator;
use super::types::{ArtifactCandidate, CandidateSource, LocatedArtifact};
use crate::metrics::{LOCATOR_POLLS, LOCATOR_RESULTS};

/// Whether `name` carries one of the transient markers (case-insensitive).
pub fn is_transient_name(name: &str, markers: &[String]) -> bool {
    let lower = name.to_lowercase();
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|m| lower.contains(&m.to_lowercase()))
}

/// Filters one scan's candidates and orders them best first.
///
/// Drops transient names, files older than the freshness threshold and, when
/// a pattern is given, names not containing it. Primary-directory files sort
/// ahead of every fallback file; ties inside a tier go to the youngest file.
pub fn select_candidates(
    candidates: Vec<ArtifactCandidate>,
    config: &LocatorConfig,
    pattern: Option<&str>,
) -> Vec<ArtifactCandidate> {
    let freshness = config.freshness();
    let pattern = pattern.map(str::to_lowercase);

    let mut selected: Vec<ArtifactCandidate> = candidates
        .into_iter()
        .filter(|c| !c.transient)
        .filter(|c| c.age <= freshness)
        .filter(|c| match &pattern {
            Some(p) => c.file_name().to_lowercase().contains(p.as_str()),
            None => true,
        })
        .collect();

    selected.sort_by(|a, b| a.source.cmp(&b.source).then(a.age.cmp(&b.age)));
    selected
}

/// Locator scanning a primary directory and ordered fallbacks.
pub struct FsArtifactLocator {
    config: LocatorConfig,
    primary: PathBuf,
    fallbacks: Vec<PathBuf>,
}

impl FsArtifactLocator {
    /// Creates a locator. Fallbacks equal to the primary directory are ignored.
    pub fn new(config: LocatorConfig, primary: PathBuf, fallbacks: Vec<PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::new();
        for dir in fallbacks {
            if dir != primary && !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        Self {
            config,
            primary,
            fallbacks: unique,
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Directories in scan order.
    pub fn directories(&self) -> Vec<PathBuf> {
        std::iter::once(self.primary.clone())
            .chain(self.fallbacks.iter().cloned())
            .collect()
    }

    fn search_order(&self) -> impl Iterator<Item = (&Path, CandidateSource)> {
        std::iter::once((self.primary.as_path(), CandidateSource::Primary)).chain(
            self.fallbacks
                .iter()
                .map(|d| (d.as_path(), CandidateSource::Fallback)),
        )
    }

    /// Lists every file with an accepted extension in `dir`.
    async fn scan_directory(&self, dir: &Path, source: CandidateSource) -> Vec<ArtifactCandidate> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let now = SystemTime::now();
        let mut found = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error reading directory {}: {}", dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !self.config.accepts_extension(extension) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let born = metadata.created().or_else(|_| metadata.modified()).ok();
            let age = born
                .and_then(|t| now.duration_since(t).ok())
                .unwrap_or(Duration::ZERO);
            let name = entry.file_name().to_string_lossy().into_owned();

            found.push(ArtifactCandidate {
                transient: is_transient_name(&name, &self.config.transient_markers),
                path,
                directory: dir.to_path_buf(),
                source,
                age,
                size: metadata.len(),
            });
        }

        found
    }

    /// One scan over every directory, returning ranked usable candidates.
    async fn scan(&self, pattern: Option<&str>) -> Vec<ArtifactCandidate> {
        let mut all = Vec::new();
        for (dir, source) in self.search_order() {
            all.extend(self.scan_directory(dir, source).await);
        }
        select_candidates(all, &self.config, pattern)
    }
}

/// Non-empty and readable right now. A producer holding an exclusive lock
/// makes the open or the read fail.
async fn is_accessible(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => {}
        _ => return false,
    }

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return false,
    };
    let mut buf = [0u8; 1];
    matches!(file.read(&mut buf).await, Ok(1))
}

#[async_trait]
impl ArtifactLocator for FsArtifactLocator {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn locate(
        &self,
        max_wait: Duration,
        pattern: Option<&str>,
    ) -> Result<LocatedArtifact, LocatorError> {
        let start = Instant::now();
        let poll_interval = self.config.poll_interval();
        let mut polls = 0u32;

        info!(
            "Looking for artifact in {} (+{} fallbacks), waiting up to {:?}",
            self.primary.display(),
            self.fallbacks.len(),
            max_wait
        );

        loop {
            polls += 1;
            LOCATOR_POLLS.inc();

            for candidate in self.scan(pattern).await {
                if is_accessible(&candidate.path).await {
                    let elapsed = start.elapsed();
                    info!(
                        "Found artifact {} ({} bytes, {:?} old) after {} polls",
                        candidate.path.display(),
                        candidate.size,
                        candidate.age,
                        polls
                    );
                    LOCATOR_RESULTS.with_label_values(&["found"]).inc();
                    return Ok(LocatedArtifact {
                        path: candidate.path,
                        directory: candidate.directory,
                        source: candidate.source,
                        size: candidate.size,
                        age: candidate.age,
                        polls,
                        elapsed,
                    });
                }
                debug!(
                    "Candidate {} is empty or locked, trying next",
                    candidate.path.display()
                );
            }

            let elapsed = start.elapsed();
            if elapsed >= max_wait {
                break;
            }
            tokio::time::sleep(poll_interval.min(max_wait - elapsed)).await;
        }

        let waited = start.elapsed();
        warn!("No artifact found after {:?} ({} polls)", waited, polls);
        LOCATOR_RESULTS.with_label_values(&["not_found"]).inc();
        Err(LocatorError::NotFound {
            waited,
            polls,
            directories: self.directories(),
        })
    }

    async fn wait_for_stability(&self, path: &Path, max_wait: Duration) -> bool {
        let start = Instant::now();
        let interval = self.config.stability_interval();
        let required = self.config.stability_checks.max(1);
        let mut last: Option<(u64, Option<SystemTime>)> = None;
        let mut stable = 0u32;

        while start.elapsed() < max_wait {
            match tokio::fs::metadata(path).await {
                Ok(meta) => {
                    let observed = (meta.len(), meta.modified().ok());
                    if last == Some(observed) {
                        stable += 1;
                        if stable >= required {
                            debug!("{} stable after {:?}", path.display(), start.elapsed());
                            return true;
                        }
                    } else {
                        stable = 0;
                        last = Some(observed);
                    }
                }
                Err(e) => {
                    debug!("Cannot stat {}: {}", path.display(), e);
                    stable = 0;
                    last = None;
                }
            }
            tokio::time::sleep(interval).await;
        }

        warn!(
            "{} did not stabilise within {:?}",
            path.display(),
            max_wait
        );
        false
    }
}
