//! Bounded retry for transient store failures. One wrapper, applied
//! uniformly at the service layer, instead of hand-written loops per
//! operation.

use std::thread;
use std::time::Duration;

use super::repository::RepositoryError;

/// How often and how patiently store operations are re-attempted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Same bound, no sleeping. For tests.
    pub const fn immediate() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    /// Linear backoff: attempt-number times the base delay.
    fn delay_before(self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `operation`, re-attempting only on `Unavailable` up to the policy
/// bound. The last error is surfaced unmodified; retries are a resilience
/// measure, never a correctness mechanism.
pub fn with_retry<T>(
    policy: RetryPolicy,
    mut operation: impl FnMut() -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(RepositoryError::Unavailable(reason)) if attempt < attempts => {
                tracing::warn!(attempt, %reason, "transient store failure, retrying");
                thread::sleep(policy.delay_before(attempt));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
