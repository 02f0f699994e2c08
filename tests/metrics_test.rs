//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use quizfetch::telemetry;
use quizfetch::{BoxError, CacheKey, FetchCache, LoadOptions};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_where(snapshot, name, |_| true)
}

/// Sum counter values for `name` whose labels include `label = value`.
fn counter_labelled(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    counter_where(snapshot, name, |key| {
        key.key()
            .labels()
            .any(|l| l.key() == label && l.value() == value)
    })
}

fn counter_where(
    snapshot: &SnapshotVec,
    name: &str,
    filter: impl Fn(&metrics_util::CompositeKey) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| filter(key))
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope.
///
/// Fetches run on spawned tasks, so the runtime is current-thread and built
/// inside the recorder scope: every task is polled on this thread and sees
/// the thread-local recorder.
fn record<F, Fut>(f: F) -> SnapshotVec
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
            .block_on(f())
    });

    snapshotter.snapshot().into_vec()
}

fn counting_provider(
    calls: Arc<AtomicU32>,
) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, BoxError>> + Send>>
+ Send
+ Sync
+ 'static {
    move || {
        let calls = calls.clone();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn miss_then_hit_records_cache_metrics() {
    let snapshot = record(|| async {
        let cache = FetchCache::<u32>::new();
        let key = CacheKey::new("leaderboard");
        let calls = Arc::new(AtomicU32::new(0));
        let options = LoadOptions::default();

        cache
            .load_with(&key, counting_provider(calls.clone()), &options)
            .await
            .unwrap();
        cache
            .load_with(&key, counting_provider(calls.clone()), &options)
            .await
            .unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_labelled(
            &snapshot,
            telemetry::CACHE_HITS_TOTAL,
            "resource",
            "leaderboard"
        ),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "status", "ok"),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::FETCH_DURATION_SECONDS));
}

#[test]
fn coalesced_callers_are_counted() {
    let snapshot = record(|| async {
        let cache = FetchCache::<u32>::new();
        let key = CacheKey::new("rewards");
        let calls = Arc::new(AtomicU32::new(0));
        let options = LoadOptions::default();

        let (a, b, c) = tokio::join!(
            cache.load_with(&key, counting_provider(calls.clone()), &options),
            cache.load_with(&key, counting_provider(calls.clone()), &options),
            cache.load_with(&key, counting_provider(calls.clone()), &options),
        );
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 3);
    assert_eq!(counter_total(&snapshot, telemetry::COALESCED_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 1);
}

#[test]
fn failures_are_labelled_by_kind() {
    let snapshot = record(|| async {
        let cache = FetchCache::<u32>::new();

        let failing = || async { Err::<u32, BoxError>("backend down".into()) };
        let err = cache
            .load_with(&CacheKey::new("stats"), failing, &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(!err.is_timeout());

        let slow = || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<u32, BoxError>(1)
        };
        let options = LoadOptions::default().timeout(Duration::from_millis(100));
        let err = cache
            .load_with(&CacheKey::new("stats"), slow, &options)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    });

    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "status", "provider"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "status", "timeout"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "status", "ok"),
        0
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let cache = FetchCache::<u32>::new();
    let value = cache
        .load_with(
            &CacheKey::new("quiz"),
            || async { Ok::<u32, BoxError>(7) },
            &LoadOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(value, 7);
}
