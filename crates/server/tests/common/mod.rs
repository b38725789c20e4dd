//! Common test utilities for API testing with mocks.
//!
//! Builds the control API in-process over an orchestrator wired to the core
//! mocks and a scheduler driven by a manual clock, so requests can be sent
//! with `oneshot` and no external infrastructure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reportrelay_core::config::Config;
use reportrelay_core::locator::FsArtifactLocator;
use reportrelay_core::scheduler::{ScheduledWorkflow, TomlSchedulePersister};
use reportrelay_core::testing::{fixtures, ManualClock, MockExtractor, MockTransformer};
use reportrelay_core::{Orchestrator, Scheduler};
use reportrelay_server::api::create_router;
use reportrelay_server::state::{AppState, ProgressTracker};

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_manual_run() {
///     let fixture = TestFixture::new();
///     let response = fixture.post("/api/v1/runs", json!({})).await;
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub state: Arc<AppState>,
    /// Mock extractor - control failures and run duration
    pub extractor: Arc<MockExtractor>,
    pub clock: Arc<ManualClock>,
    /// Config file the scheduler persists run-time changes into
    pub config_path: PathBuf,
    /// Temporary directory for downloads, backups and the config file
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with a fast extractor.
    pub fn new() -> Self {
        Self::with_extractor(MockExtractor::new().with_output(b"zerf report".to_vec()))
    }

    pub fn with_extractor(extractor: MockExtractor) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config: Config = fixtures::test_config(temp_dir.path());

        let config_path = temp_dir.path().join("reportrelay.toml");
        std::fs::write(&config_path, "[schedule]\nrun_time = \"08:00\"\n")
            .expect("Failed to write config file");

        let extractor = Arc::new(extractor);
        let locator = Arc::new(FsArtifactLocator::new(
            config.locator.clone(),
            config.paths.download_dir.clone(),
            config.paths.fallback_dirs.clone(),
        ));
        let transformer = Arc::new(MockTransformer::new(config.paths.processed_dir.clone()));

        let progress = ProgressTracker::default();
        let orchestrator = Arc::new(
            Orchestrator::new(
                config.clone(),
                extractor.clone(),
                locator,
                transformer,
                None,
            )
            .with_progress_callback(progress.callback()),
        );

        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2025, 8, 3)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
        ));
        let workflow: Arc<dyn ScheduledWorkflow> = orchestrator.clone();
        let scheduler = Scheduler::new(&config.schedule, workflow, orchestrator.schedule_state())
            .expect("Failed to create scheduler")
            .with_clock(clock.clone())
            .with_check_interval(Duration::from_millis(10))
            .with_persister(Arc::new(TomlSchedulePersister::new(&config_path)));

        let state = Arc::new(AppState::new(
            config,
            orchestrator,
            Arc::new(scheduler),
            progress,
        ));
        let router = create_router(state.clone());

        Self {
            router,
            state,
            extractor,
            clock,
            config_path,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Poll `GET /api/v1/status` until `check` holds or five seconds pass.
    pub async fn wait_for_status<F: Fn(&Value) -> bool>(&self, check: F) -> Option<Value> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let response = self.get("/api/v1/status").await;
            if check(&response.body) {
                return Some(response.body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
