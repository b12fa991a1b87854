//! Timeouts and bounded retry for remote transport calls.

use crate::error::{RelayError, TransportError};
use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Exponential backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Fraction of each delay added as random jitter
    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: f64,
}

impl RetryPolicy {
    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        if !(1.0..=10.0).contains(&self.backoff_factor) {
            return Err("backoff_factor must be between 1.0 and 10.0");
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err("jitter_fraction must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// Delay before retry number `retry` (0-indexed), capped and jittered.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(retry as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_range = capped * self.jitter_fraction;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_range)
        } else {
            0.0
        };

        Duration::from_secs_f64(capped + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_factor: default_backoff_factor(),
            jitter_fraction: default_jitter_fraction(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter_fraction() -> f64 {
    0.1
}

/// How every remote call is bounded.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(call_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            call_timeout,
            retry,
        }
    }

    /// Run `call` under the timeout, retrying transient failures.
    ///
    /// A failure on the only permitted attempt surfaces as
    /// [`RelayError::Transport`]; running out of retries surfaces as
    /// [`RelayError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.call_timeout)),
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= max_attempts {
                if attempt > 1 {
                    warn!(operation, attempt, "Giving up: {}", error);
                    return Err(RelayError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: error,
                    });
                }
                return Err(RelayError::Transport(error));
            }

            let delay = self.retry.delay_for_retry(attempt - 1);
            debug!(operation, attempt, ?delay, "Retrying after: {}", error);
            sleep(delay).await;
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), RetryPolicy::default())
    }
}
