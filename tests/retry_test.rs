use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quizfetch::{
    BoxError, CacheKey, DataProvider, ErrorKind, FetchCache, LoadOptions, RetryConfig,
    RetryingProvider, with_retry,
};
use tokio::time::Instant;

/// Mock provider that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    fail_with: &'static str,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32, fail_with: &'static str) -> Self {
        Self {
            fail_count: AtomicU32::new(failures),
            fail_with,
            total_calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DataProvider<String> for FailThenSucceed {
    async fn fetch(&self) -> Result<String, BoxError> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_count.fetch_sub(1, Ordering::Relaxed);
            return Err(self.fail_with.into());
        }
        Ok("ok".into())
    }
}

fn is_transient(e: &BoxError) -> bool {
    !e.to_string().contains("404")
}

#[tokio::test(start_paused = true)]
async fn retries_on_transient_error_then_succeeds() {
    let inner = Arc::new(FailThenSucceed::new(2, "503 service unavailable"));
    let provider = RetryingProvider::<String>::new(
        inner.clone(),
        RetryConfig::new()
            .max_attempts(3)
            .initial_delay(Duration::from_millis(10)),
        "leaderboard",
    );

    let result = provider.fetch().await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(inner.call_count(), 3); // 2 failures + 1 success
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let inner = Arc::new(FailThenSucceed::new(10, "503 service unavailable"));
    let provider = RetryingProvider::<String>::new(
        inner.clone(),
        RetryConfig::new()
            .max_attempts(3)
            .initial_delay(Duration::from_millis(10)),
        "leaderboard",
    );

    let err = provider.fetch().await.unwrap_err();

    assert_eq!(err.to_string(), "503 service unavailable");
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn does_not_retry_rejected_errors() {
    let inner = Arc::new(FailThenSucceed::new(1, "404 not found"));
    let provider = RetryingProvider::<String>::new(
        inner.clone(),
        RetryConfig::new().retry_if(is_transient),
        "rewards",
    );

    assert!(provider.fetch().await.is_err());
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_config_makes_one_attempt() {
    let inner = Arc::new(FailThenSucceed::new(1, "503 service unavailable"));
    let provider =
        RetryingProvider::<String>::new(inner.clone(), RetryConfig::disabled(), "rewards");

    assert!(provider.fetch().await.is_err());
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_are_applied() {
    let calls = AtomicU32::new(0);
    let config = RetryConfig::new()
        .max_attempts(4)
        .initial_delay(Duration::from_millis(100));

    let started = Instant::now();
    let result = with_retry(&config, "stats", || async {
        if calls.fetch_add(1, Ordering::SeqCst) < 3 {
            Err::<u32, BoxError>("flaky".into())
        } else {
            Ok(42)
        }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    // 100 + 200 + 400
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(710));
}

#[tokio::test(start_paused = true)]
async fn cache_timeout_bounds_the_whole_retry_loop() {
    let inner = Arc::new(FailThenSucceed::new(10, "503 service unavailable"));
    let provider = Arc::new(RetryingProvider::<String>::new(
        inner.clone(),
        RetryConfig::new()
            .max_attempts(10)
            .initial_delay(Duration::from_millis(100)),
        "leaderboard",
    ));
    let cache = FetchCache::<String>::new();
    let options = LoadOptions::default().timeout(Duration::from_millis(250));

    let err = cache
        .load(&CacheKey::new("leaderboard"), provider, &options)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    // Attempts at t=0, 100 and 300ms; the caller gives up before the third
    assert_eq!(inner.call_count(), 2);
}
