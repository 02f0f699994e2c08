//! quizfetch - coalescing data-fetching cache for quiz-platform front-ends
//!
//! UI components bind to read-mostly backend resources (dashboards,
//! leaderboards, reward catalogues) through a shared [`FetchCache`]. The
//! cache memoizes successful responses with a per-read TTL, coalesces
//! concurrent requests for the same key into one provider call, and races
//! each call against a timeout. [`Binding`]s expose `{data, loading, error}`
//! per consumer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quizfetch::{Binding, BindingConfig, BoxError, CacheKey, FetchCache};
//!
//! #[tokio::main]
//! async fn main() -> quizfetch::Result<()> {
//!     let cache = FetchCache::<serde_json::Value>::new();
//!     let key = CacheKey::resolve("analytics.dashboard", &("quiz-42", "week"))?;
//!
//!     let binding = Binding::new(
//!         &cache,
//!         key,
//!         Arc::new(|| async { Ok::<_, BoxError>(serde_json::json!({ "attempts": 128 })) }),
//!         BindingConfig::default(),
//!     );
//!
//!     binding.activate().await;
//!     println!("{:?}", binding.state().data);
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod inflight;
pub mod key;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use binding::{Binding, BindingBuilder};
pub use config::{CacheSettings, ResourceOverride};
pub use error::{BoxError, ErrorKind, FetchError, Result};
pub use fetcher::FetchCache;
pub use inflight::InflightRegistry;
pub use key::CacheKey;
pub use retry::{RetryConfig, RetryingProvider, with_retry};
pub use store::{CacheEntry, CacheStore};
pub use traits::DataProvider;

pub use types::{
    BindingConfig, BindingState, DEFAULT_TIMEOUT, DEFAULT_TTL, HostEvent, HostEvents, LoadOptions,
    Phase,
};
