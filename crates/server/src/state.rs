use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

use reportrelay_core::orchestrator::{ProgressCallback, RunProgress};
use reportrelay_core::scheduler::{ScheduledWorkflow, TomlSchedulePersister};
use reportrelay_core::{Config, Orchestrator, SanitizedConfig, Scheduler};

/// Latest step reported by the orchestrator's progress callback.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker(Arc<RwLock<Option<RunProgress>>>);

impl ProgressTracker {
    pub fn callback(&self) -> ProgressCallback {
        let slot = self.0.clone();
        Arc::new(move |progress: &RunProgress| {
            debug!(
                "[{}] step {}/{}: {}",
                progress.run_id, progress.step_number, progress.total_steps, progress.message
            );
            match slot.write() {
                Ok(mut guard) => *guard = Some(progress.clone()),
                Err(poisoned) => *poisoned.into_inner() = Some(progress.clone()),
            }
        })
    }

    pub fn current(&self) -> Option<RunProgress> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<Scheduler>,
    progress: ProgressTracker,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<Orchestrator>,
        scheduler: Arc<Scheduler>,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            config,
            orchestrator,
            scheduler,
            progress,
        }
    }

    /// Wire the production orchestrator and a scheduler that publishes into
    /// the orchestrator's status. Run-time changes are written back to
    /// `config_path`.
    pub fn from_config(config: Config, config_path: &Path) -> Result<Self> {
        let progress = ProgressTracker::default();
        let orchestrator = Arc::new(
            Orchestrator::from_config(config.clone())
                .context("Failed to create orchestrator")?
                .with_progress_callback(progress.callback()),
        );

        let workflow: Arc<dyn ScheduledWorkflow> = orchestrator.clone();
        let mut scheduler = Scheduler::new(
            &config.schedule,
            workflow,
            orchestrator.schedule_state(),
        )
        .context("Failed to create scheduler")?;
        if config_path.exists() {
            scheduler = scheduler.with_persister(Arc::new(TomlSchedulePersister::new(config_path)));
        }

        Ok(Self::new(
            config,
            orchestrator,
            Arc::new(scheduler),
            progress,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }
}
