//! # Retry Policy
//!
//! A uniform wrapper for external API calls that may fail transiently.
//! Classification is by error message: providers surface rate limiting and
//! overload as text (`"rate limit"`, `"429"`, `"503"`, ...), so the policy
//! matches those signals case-insensitively and retries with exponential
//! backoff. Everything else propagates immediately.
//!
//! There are two adapters over one backoff core: [`RetryPolicy::run`] for
//! async callers and [`RetryPolicy::run_blocking`] for synchronous ones.
//! Both produce the same attempt/delay sequence; only the suspension
//! mechanism differs, so the two forms cannot drift apart.

use crate::errors::ApiFailure;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Error-message fragments that mark a failure as transient.
const RETRYABLE_SIGNALS: &[&str] = &[
    "rate limit",
    "timeout",
    "429",
    "503",
    "too many requests",
    "overloaded",
];

/// Whether an error message carries a transient signal.
pub fn is_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_SIGNALS.iter().any(|signal| lower.contains(signal))
}

/// Bounded exponential backoff for external API calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before retry `n` (1-based): `base_delay * 2^(n-1)`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Runs `op` under the policy, suspending between attempts.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, ApiFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let message = e.to_string();
                    if is_retryable(&message) && attempt < self.max_attempts {
                        let delay = self.delay_for_attempt(attempt);
                        warn!(
                            "Retryable API error (attempt {attempt}/{}), retrying in {delay:?}: {message}",
                            self.max_attempts
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    error!("API call failed after {attempt} attempt(s): {message}");
                    return Err(ApiFailure(message));
                }
            }
        }
    }

    /// Runs `op` under the policy, blocking the calling thread between
    /// attempts. Identical backoff math to [`RetryPolicy::run`].
    pub fn run_blocking<F, T, E>(&self, mut op: F) -> Result<T, ApiFailure>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let message = e.to_string();
                    if is_retryable(&message) && attempt < self.max_attempts {
                        let delay = self.delay_for_attempt(attempt);
                        warn!(
                            "Retryable API error (attempt {attempt}/{}), retrying in {delay:?}: {message}",
                            self.max_attempts
                        );
                        std::thread::sleep(delay);
                        continue;
                    }
                    error!("API call failed after {attempt} attempt(s): {message}");
                    return Err(ApiFailure(message));
                }
            }
        }
    }
}
