//! Retry policy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff policy.
///
/// The delay after the `n`-th failed attempt is
/// `min(max_delay, initial_delay * backoff_multiplier^(n-1))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after every failure.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    4_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Policy for the extraction call: 3 attempts, 4s growing to at most 10s.
    pub fn extraction() -> Self {
        Self::default()
    }

    /// Policy for the upload call: 3 attempts, 2s growing to at most 10s.
    pub fn upload() -> Self {
        Self {
            initial_delay_ms: 2_000,
            ..Self::default()
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the initial and maximum delay.
    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay_ms = initial.as_millis() as u64;
        self.max_delay_ms = max.as_millis() as u64;
        self
    }

    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(63) as i32;
        // A multiplier below 1 would shrink delays; clamp so the sequence never decreases.
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let raw = self.initial_delay_ms as f64 * factor;
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// All delays slept between attempts (`max_attempts - 1` entries).
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_delays() {
        let config = RetryConfig::extraction();
        assert_eq!(
            config.delays(),
            vec![Duration::from_secs(4), Duration::from_secs(8)]
        );
    }

    #[test]
    fn test_delays_capped() {
        let config = RetryConfig::extraction().with_max_attempts(6);
        assert_eq!(
            config.delays(),
            vec![
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
    }

    #[test]
    fn test_delays_non_decreasing_and_capped() {
        let multipliers = [0.5, 1.0, 1.5, 2.0, 3.0, 10.0];
        let initials = [0u64, 1, 250, 4_000, 20_000];
        let maxima = [0u64, 100, 10_000, 60_000];

        for &backoff_multiplier in &multipliers {
            for &initial_delay_ms in &initials {
                for &max_delay_ms in &maxima {
                    for max_attempts in 1..=8 {
                        let config = RetryConfig {
                            max_attempts,
                            initial_delay_ms,
                            max_delay_ms,
                            backoff_multiplier,
                        };
                        let delays = config.delays();
                        assert_eq!(delays.len() as u32, max_attempts - 1);
                        for pair in delays.windows(2) {
                            assert!(pair[0] <= pair[1], "{:?} decreased", config);
                        }
                        for delay in &delays {
                            assert!(*delay <= Duration::from_millis(max_delay_ms));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_none_has_no_delays() {
        assert!(RetryConfig::none().delays().is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RetryConfig = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay_ms, 4_000);
        assert_eq!(config.max_delay_ms, 10_000);
    }
}
