//! Retry utilities with exponential backoff for transient backend failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl RetryConfig {
    /// A configuration that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the total number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Backoff delay before retry number `attempt` (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay_ms as f64 * self.backoff_multiplier.powf(attempt as f64 - 1.0);
        Duration::from_millis(exp.min(self.max_delay_ms as f64) as u64)
    }

    fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Connection could not be established
    Network,
    /// HTTP 429
    RateLimit,
    /// HTTP 502, 503 or 504
    ServiceUnavailable,
}

impl TransientError {
    /// Classify a SourceError. Timeouts and parse errors are not transient.
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Unavailable(_) => Some(TransientError::ServiceUnavailable),
            _ => None,
        }
    }

    /// Minimum delay recommended for this error
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::RateLimit => Duration::from_secs(1),
            TransientError::ServiceUnavailable => Duration::from_secs(2),
            TransientError::Network => Duration::from_millis(500),
        }
    }
}

/// Execute an async operation, retrying transient failures with
/// exponential backoff.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!("Request succeeded on attempt {}", attempts);
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts {
                    if config.max_attempts > 1 {
                        tracing::warn!("Request failed after {} attempts: {}", attempts, error);
                    }
                    return Err(error);
                }

                let delay = config
                    .backoff(attempts)
                    .max(transient.recommended_delay())
                    .min(config.max_delay());

                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
