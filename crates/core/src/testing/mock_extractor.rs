//! Mock extractor for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::extraction::{ExtractionError, ExtractionOutcome, ExtractionRequest, Extractor};

/// Mock implementation of the Extractor trait.
///
/// Provides controllable behavior for testing:
/// - Fail the next N runs with a script error
/// - Make the probe report the automation surface as unavailable
/// - Write the expected artifact on success, like the real script does
/// - Record every request for assertions
#[derive(Debug)]
pub struct MockExtractor {
    available: AtomicBool,
    failures_remaining: AtomicU32,
    run_count: AtomicU32,
    probe_count: AtomicU32,
    requests: Mutex<Vec<ExtractionRequest>>,
    output: Mutex<Option<Vec<u8>>>,
    run_delay: Mutex<Duration>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            failures_remaining: AtomicU32::new(0),
            run_count: AtomicU32::new(0),
            probe_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            output: Mutex::new(None),
            run_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Successful runs write `content` to the request's target file.
    pub fn with_output(self, content: impl Into<Vec<u8>>) -> Self {
        *self.output.lock().unwrap() = Some(content.into());
        self
    }

    /// Each run sleeps this long before finishing.
    pub fn with_run_delay(self, delay: Duration) -> Self {
        *self.run_delay.lock().unwrap() = delay;
        self
    }

    /// The next `n` runs exit with a non-zero code.
    pub fn fail_next_runs(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn run_count(&self) -> u32 {
        self.run_count.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> u32 {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Requests seen by `run`, in order.
    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self) -> Result<(), ExtractionError> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExtractionError::unavailable("mock automation surface is offline"))
        }
    }

    async fn run(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.run_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ExtractionError::script_failed(Some(1), "mock extraction failure"));
        }

        let target = request.target_file();
        let output = self.output.lock().unwrap().clone();
        if let Some(content) = output {
            tokio::fs::create_dir_all(&request.download_dir).await?;
            tokio::fs::write(&target, content).await?;
        }

        Ok(ExtractionOutcome {
            script_path: PathBuf::from("mock-script.vbs"),
            expected_output: target,
            duration_ms: delay.as_millis() as u64,
            stdout_tail: String::new(),
        })
    }
}
