use std::thread;
use std::time::Duration;
use tracing::warn;

use threatscore_core::config::RetrySettings;
use threatscore_core::error::Result;

/// Bounded retry with doubling backoff around document store calls.
///
/// The default makes a single attempt. Only errors reporting
/// `is_recoverable()` are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_attempts: 1, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
    }

    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_backoff, max_backoff }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.initial_backoff(), settings.max_backoff())
    }

    /// Wait before the retry that follows failed `attempt` (1-based), never above `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.checked_mul(factor).unwrap_or(self.max_backoff).min(self.max_backoff)
    }

    pub fn run<T>(&self, op: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_recoverable() && attempt < self.max_attempts => {
                    warn!(op, attempt, max_attempts = self.max_attempts, error = %e, "store call failed, retrying");
                    thread::sleep(self.backoff(attempt));
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
