//! Bounded retry with exponential backoff.
//!
//! Used around the extraction call and the upload call. Every attempt is
//! independent: the operation closure receives the 1-based attempt number and
//! must rebuild whatever state it needs.

mod backoff;
mod config;

pub use backoff::{retry_with_backoff, RetryOutcome, RetryState, Retryable};
pub use config::RetryConfig;
