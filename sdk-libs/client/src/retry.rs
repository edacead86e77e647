//! Retry and timeout combinators shared by the indexer, the RPC client and
//! the burner.

use std::{fmt::Display, future::Future, time::Duration};

use thiserror::Error;
use tracing::{error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt. Doubles after every further failure.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Backoff to wait after `attempt` (1-based) failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RetryError<E> {
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::NonRetryable(e) => e,
        }
    }

    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Exhausted { attempts, .. } => Some(*attempts),
            RetryError::NonRetryable(_) => None,
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or `config.max_attempts` is reached. Sleeps with exponential
/// backoff between attempts.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    config: RetryConfig,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        trace!("Attempt {}/{}: Executing operation", attempts, max_attempts);

        match operation().await {
            Ok(value) => {
                trace!("Attempt {}/{}: Operation succeeded.", attempts, max_attempts);
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => {
                error!("Operation failed with non-retryable error: {}", e);
                return Err(RetryError::NonRetryable(e));
            }
            Err(e) if attempts >= max_attempts => {
                error!("Operation failed after {} attempts: {}", attempts, e);
                return Err(RetryError::Exhausted { attempts, last: e });
            }
            Err(e) => {
                let delay = config.delay_for_attempt(attempts);
                warn!(
                    "Attempt {}/{}: Operation failed, retrying in {:?}: {}",
                    attempts, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} timed out after {after:?}")]
pub struct TimeoutError {
    pub operation: String,
    pub after: Duration,
}

/// Races `future` against a timer.
pub async fn with_timeout<T, Fut>(
    operation: &str,
    after: Duration,
    future: Fut,
) -> Result<T, TimeoutError>
where
    Fut: Future<Output = T>,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| TimeoutError {
            operation: operation.to_string(),
            after,
        })
}
