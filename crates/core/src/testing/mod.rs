//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the workflow, so orchestrator and
//! scheduler behavior can be tested without the automation host, the
//! transform program or the remote document store.
//!
//! # Example
//!
//! ```rust,ignore
//! use reportrelay_core::testing::{fixtures, MockExtractor, MockTransformer};
//!
//! let dir = tempfile::TempDir::new()?;
//! let config = fixtures::test_config(dir.path());
//! let extractor = MockExtractor::new().with_output(b"report".to_vec());
//! extractor.fail_next_runs(2);
//! ```

mod mock_extractor;
mod mock_transformer;
mod mock_uploader;
mod mock_workflow;

pub use mock_extractor::MockExtractor;
pub use mock_transformer::MockTransformer;
pub use mock_uploader::MockUploader;
pub use mock_workflow::{ManualClock, MockWorkflow};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::Config;
    use crate::orchestrator::WorkflowConfig;
    use crate::retry::RetryConfig;
    use crate::transform::TransformConfig;

    /// A valid configuration rooted at `root` with millisecond-scale
    /// delays: no settle delay, 50 ms polling, 1 s artifact wait, and
    /// retries with 1 ms backoff.
    pub fn test_config(root: &Path) -> Config {
        let mut config = Config::default();

        config.paths.download_dir = root.join("downloads");
        config.paths.fallback_dirs = Vec::new();
        config.paths.backup_dir = root.join("backup");
        config.paths.processed_dir = root.join("processed");

        config.workflow = WorkflowConfig::immediate(1);
        config.locator = config
            .locator
            .with_poll_interval(Duration::from_millis(50))
            .with_stability(2, Duration::from_millis(10));

        let fast = |retry: RetryConfig| {
            retry.with_delays(Duration::from_millis(1), Duration::from_millis(5))
        };
        config.extraction.retry = fast(RetryConfig::extraction());
        config.upload.retry = fast(RetryConfig::upload());

        config.transform = TransformConfig::with_command("clean-report", vec![]);
        config
    }
}
