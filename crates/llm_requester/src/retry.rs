use log::{debug, warn};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::Retryable;
use crate::pkg_config::RetryConfig;

/// Bounded retry with randomized exponential backoff.
///
/// The delay before attempt `n + 1` is drawn uniformly from
/// `[min_delay, min(max_delay, multiplier * 2^(n-1))]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    min_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(6, Duration::from_secs(1), Duration::from_secs(10))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_secs_f64(cfg.min_delay_secs),
            Duration::from_secs_f64(cfg.max_delay_secs),
        )
        .with_multiplier(cfg.multiplier)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
            multiplier: 1.0,
        }
    }

    /// Policy that retries immediately. Used by tests and local tooling.
    pub fn without_delay(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() && multiplier > 0.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Wait before the attempt following `attempt` (1-based): uniform in
    /// `[min, clamp(multiplier * 2^(attempt-1), min, max)]`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let lower = self.min_delay.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let upper = (self.multiplier * 2f64.powi(exponent))
            .min(self.max_delay.as_secs_f64())
            .max(lower);

        if upper <= lower {
            return self.min_delay;
        }

        let secs = rand::thread_rng().gen_range(lower..upper);
        Duration::from_secs_f64(secs)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the attempt
    /// budget is spent. Each call of `op` is one attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("{}: attempt {} of {}", label, attempt, self.max_attempts);

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    warn!("{}: giving up after {} attempts: {}", label, attempt, e);
                    return Err(e.into_exhausted(attempt));
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{}: attempt {} of {} failed: {}, retrying in {:.2}s",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
