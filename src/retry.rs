//! Retry with exponential backoff, layered on top of a provider.
//!
//! The cache itself never retries: a failed load surfaces once as `error`
//! on the binding. Callers who want retries wrap their provider in a
//! [`RetryingProvider`] before handing it to the cache. All attempts then
//! count as one load, so the cache's timeout bounds how long callers wait
//! for the whole retry loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::BoxError;
use crate::traits::DataProvider;

/// Configuration for retry behaviour.
///
/// ```rust
/// # use quizfetch::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
    /// Which errors are worth retrying. Default: all of them.
    pub retry_if: fn(&BoxError) -> bool,
}

fn always(_: &BoxError) -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_if: always,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn retry_if(mut self, predicate: fn(&BoxError) -> bool) -> Self {
        self.retry_if = predicate;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Run `f` until it succeeds, a non-retryable error occurs, or attempts run out.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, label: &str, f: F) -> Result<T, BoxError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts && (config.retry_if)(&e) => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    label,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after provider error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decorator that wraps a [`DataProvider`] with retry logic.
pub struct RetryingProvider<V> {
    inner: Arc<dyn DataProvider<V>>,
    config: RetryConfig,
    label: String,
}

impl<V> RetryingProvider<V> {
    /// Wrap a provider. `label` identifies it in logs (usually the resource id).
    pub fn new(inner: Arc<dyn DataProvider<V>>, config: RetryConfig, label: impl Into<String>) -> Self {
        Self {
            inner,
            config,
            label: label.into(),
        }
    }
}

#[async_trait]
impl<V> DataProvider<V> for RetryingProvider<V>
where
    V: Send + 'static,
{
    async fn fetch(&self) -> Result<V, BoxError> {
        with_retry(&self.config, &self.label, || self.inner.fetch()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(30), Duration::from_millis(350));
    }

    #[test]
    fn disabled_is_single_attempt() {
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }
}
