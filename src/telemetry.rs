//! Telemetry metric name constants.
//!
//! Centralised metric names for quizfetch operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `quizfetch_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `resource` — resource identifier of the cache key (e.g. "analytics.dashboard").
//!   Dependency values are never used as labels.
//! - `status` — fetch outcome: "ok", "provider", "timeout" or "aborted"

/// Total reads answered from the store without touching the provider.
///
/// Labels: `resource`.
pub const CACHE_HITS_TOTAL: &str = "quizfetch_cache_hits_total";

/// Total reads that found no fresh entry (absent, expired, or forced).
///
/// Labels: `resource`.
pub const CACHE_MISSES_TOTAL: &str = "quizfetch_cache_misses_total";

/// Total callers that joined an already-running fetch instead of starting one.
///
/// Labels: `resource`.
pub const COALESCED_TOTAL: &str = "quizfetch_coalesced_total";

/// Total provider invocations, by outcome.
///
/// Labels: `resource`, `status`.
pub const FETCHES_TOTAL: &str = "quizfetch_fetches_total";

/// Provider call duration in seconds, including timed-out calls.
///
/// Labels: `resource`.
pub const FETCH_DURATION_SECONDS: &str = "quizfetch_fetch_duration_seconds";
