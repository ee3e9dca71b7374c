// src/provider/retry.rs — Retry with exponential backoff for solution producers
//
// Wraps any SolutionProducer with automatic retry on transient failures.
// Retries: rate limits and producer errors flagged retriable.
// Does NOT retry: malformed answers, infrastructure failures, cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{SolutionProducer, SolveOutcome};
use crate::core::types::Problem;
use crate::infra::config::ProducerConfig;
use crate::infra::errors::{BenchError, BenchResult};

const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl From<&ProducerConfig> for RetryConfig {
    fn from(cfg: &ProducerConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// A producer wrapper that adds retry with exponential backoff.
pub struct RetryProducer {
    inner: Arc<dyn SolutionProducer>,
    config: RetryConfig,
}

impl RetryProducer {
    pub fn with_config(inner: Arc<dyn SolutionProducer>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);
        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);

        Duration::from_millis((capped_ms * jitter).max(0.0) as u64)
    }

    async fn retrying<T, F, Fut>(&self, what: &str, mut call: F) -> BenchResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = BenchResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if !e.is_retriable() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        call = what,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Extract rate-limit retry delay from the error, if available.
fn rate_limit_delay(error: &BenchError) -> Option<Duration> {
    match error {
        BenchError::RateLimited { retry_after_ms } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl SolutionProducer for RetryProducer {
    async fn solve(&self, problem: &Problem, iteration: u32) -> BenchResult<SolveOutcome> {
        self.retrying("solve", || self.inner.solve(problem, iteration))
            .await
    }

    async fn fix(&self, problem: &Problem, candidate: &str, error_text: &str) -> BenchResult<String> {
        self.retrying("fix", || self.inner.fix(problem, candidate, error_text))
            .await
    }
}
