//! Bounded retries with exponential backoff

use crate::core::config::RetryConfig;
use crate::core::error::ShipResult;
use std::time::Duration;

/// How often and how patiently to retry transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl RetryPolicy {
  pub fn from_config(config: &RetryConfig) -> Self {
    Self {
      max_attempts: config.max_attempts.max(1),
      initial_backoff: config.initial_backoff(),
      max_backoff: config.max_backoff(),
    }
  }

  /// Single attempt, no waiting
  #[cfg(test)]
  pub fn none() -> Self {
    Self {
      max_attempts: 1,
      initial_backoff: Duration::ZERO,
      max_backoff: Duration::ZERO,
    }
  }

  /// Delay before attempt `attempt + 1` (attempts are 1-based)
  pub fn backoff(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    self
      .initial_backoff
      .saturating_mul(1u32 << exponent)
      .min(self.max_backoff)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::from_config(&RetryConfig::default())
  }
}

/// Run `op` until it succeeds, fails fatally, or attempts run out
///
/// Only errors whose `is_retryable()` is true are retried. `op` receives the
/// 1-based attempt number.
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> ShipResult<T>
where
  F: FnMut(u32) -> ShipResult<T>,
{
  let mut attempt = 1;
  loop {
    match op(attempt) {
      Ok(value) => {
        if attempt > 1 {
          tracing::info!(label, attempt, "succeeded after retry");
        }
        return Ok(value);
      }
      Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
        let delay = policy.backoff(attempt);
        tracing::warn!(
          label,
          attempt,
          max = policy.max_attempts,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "transient failure, retrying"
        );
        std::thread::sleep(delay);
        attempt += 1;
      }
      Err(err) => {
        tracing::debug!(label, attempt, error = %err, "giving up");
        return Err(err);
      }
    }
  }
}
