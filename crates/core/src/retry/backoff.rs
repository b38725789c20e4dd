//! The retry loop itself.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use super::RetryConfig;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Bookkeeping for one retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made so far (1-based once the first attempt started).
    pub attempts: u32,
    pub max_attempts: u32,
    /// The most recent delay slept, if any.
    pub last_delay: Option<Duration>,
}

impl RetryState {
    fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            last_delay: None,
        }
    }

    /// Number of retries, i.e. attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Final result of a retried call together with its bookkeeping.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub state: RetryState,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// configured number of attempts is used up.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let mut state = RetryState::new(config.max_attempts.max(1));

    loop {
        state.attempts += 1;

        match op(state.attempts).await {
            Ok(value) => {
                if state.attempts > 1 {
                    info!(
                        "{} succeeded on attempt {}/{}",
                        operation, state.attempts, state.max_attempts
                    );
                }
                return RetryOutcome {
                    result: Ok(value),
                    state,
                };
            }
            Err(e) if !e.is_retryable() => {
                warn!("{} failed with non-retryable error: {}", operation, e);
                return RetryOutcome {
                    result: Err(e),
                    state,
                };
            }
            Err(e) if state.exhausted() => {
                warn!(
                    "{} failed after {} attempts: {}",
                    operation, state.attempts, e
                );
                return RetryOutcome {
                    result: Err(e),
                    state,
                };
            }
            Err(e) => {
                let delay = config.delay_for_attempt(state.attempts);
                warn!(
                    "{} attempt {}/{} failed: {}. Retrying in {:?}",
                    operation, state.attempts, state.max_attempts, e, delay
                );
                state.last_delay = Some(delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
