//! Coalescing fetch orchestration.
//!
//! [`FetchCache`] ties a [`CacheStore`] and an [`InflightRegistry`] together.
//! A [`load`](FetchCache::load) call:
//!
//! 1. returns a fresh stored value if one exists (unless `force_refresh`),
//! 2. otherwise joins the pending fetch for the key if there is one,
//! 3. otherwise spawns the provider, raced against the timeout, and
//!    registers it before yielding so later callers join it.
//!
//! When the provider settles, a success is written to the store *before* the
//! registry entry is removed and before any waiter observes the value.
//! Failures (provider errors and timeouts) are never stored. Registry
//! cleanup runs from a drop guard inside the spawned task, so it happens even
//! if the provider panics.
//!
//! The fetch runs as its own tokio task. Callers that stop awaiting (a
//! torn-down binding, an aborted UI task) never cancel it for the others.
//! The provider call itself is a second detached task. On timeout the
//! waiters get [`FetchError::Timeout`] and the call keeps running; whatever
//! it later resolves to is discarded and never stored.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::inflight::{InflightGuard, InflightRegistry, SharedFetch};
use crate::key::CacheKey;
use crate::store::CacheStore;
use crate::telemetry;
use crate::traits::DataProvider;
use crate::types::LoadOptions;
use crate::{FetchError, Result};

/// Shared, cloneable handle to one cache scope.
///
/// Clones share the same store and registry. Separate `FetchCache::new()`
/// instances are fully isolated from one another.
pub struct FetchCache<V> {
    store: Arc<CacheStore<V>>,
    inflight: Arc<InflightRegistry<V>>,
}

impl<V> Clone for FetchCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            inflight: self.inflight.clone(),
        }
    }
}

impl<V> FetchCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache scope with an empty store and registry.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(CacheStore::new()), Arc::new(InflightRegistry::new()))
    }

    /// Create a cache scope over existing parts.
    pub fn with_parts(store: Arc<CacheStore<V>>, inflight: Arc<InflightRegistry<V>>) -> Self {
        Self { store, inflight }
    }

    pub fn store(&self) -> &Arc<CacheStore<V>> {
        &self.store
    }

    pub fn inflight(&self) -> &Arc<InflightRegistry<V>> {
        &self.inflight
    }

    /// Load the value for `key`, from the store, a pending fetch, or `provider`.
    ///
    /// All callers that arrive while a fetch for `key` is pending receive
    /// the same outcome, and `provider` is not invoked again for them.
    pub async fn load(
        &self,
        key: &CacheKey,
        provider: Arc<dyn DataProvider<V>>,
        options: &LoadOptions,
    ) -> Result<V> {
        let resource = key.resource().to_owned();

        if !options.force_refresh {
            if let Some(value) = self.store.get(key, options.ttl) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "resource" => resource)
                    .increment(1);
                debug!(key = %key, "cache hit");
                return Ok(value);
            }
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "resource" => resource.clone())
            .increment(1);

        let slot = self.inflight.get_or_register(key, |generation| {
            self.spawn_fetch(key.clone(), generation, provider, options)
        });
        if slot.is_joined() {
            metrics::counter!(telemetry::COALESCED_TOTAL, "resource" => resource).increment(1);
            debug!(key = %key, "joined pending fetch");
        } else {
            debug!(key = %key, force = options.force_refresh, "started fetch");
        }

        slot.into_fetch().await
    }

    /// [`load`](Self::load) with any concrete provider, e.g. a closure.
    pub async fn load_with<P>(&self, key: &CacheKey, provider: P, options: &LoadOptions) -> Result<V>
    where
        P: DataProvider<V> + 'static,
    {
        self.load(key, Arc::new(provider), options).await
    }

    fn spawn_fetch(
        &self,
        key: CacheKey,
        generation: u64,
        provider: Arc<dyn DataProvider<V>>,
        options: &LoadOptions,
    ) -> SharedFetch<V> {
        let store = self.store.clone();
        let guard = InflightGuard::new(self.inflight.clone(), key.clone(), generation);
        let timeout = options.timeout;

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let started = Instant::now();

            // The provider runs detached so a timeout only stops the wait.
            let mut call = tokio::spawn(async move { provider.fetch().await });
            let outcome = match tokio::time::timeout(timeout, &mut call).await {
                Ok(Ok(Ok(value))) => {
                    store.set(key.clone(), value.clone());
                    Ok(value)
                }
                Ok(Ok(Err(e))) => Err(FetchError::provider(e)),
                Ok(Err(e)) => Err(FetchError::Aborted(e.to_string())),
                Err(_) => Err(FetchError::Timeout(timeout)),
            };

            let resource = key.resource().to_owned();
            metrics::histogram!(telemetry::FETCH_DURATION_SECONDS, "resource" => resource.clone())
                .record(started.elapsed().as_secs_f64());
            let status = match &outcome {
                Ok(_) => "ok",
                Err(e) => e.kind().as_str(),
            };
            metrics::counter!(telemetry::FETCHES_TOTAL, "resource" => resource, "status" => status)
                .increment(1);
            if let Err(e) = &outcome {
                warn!(
                    key = %key,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    error = %e,
                    "fetch failed"
                );
            }

            outcome
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(FetchError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    /// Fresh stored value for `key`, without fetching.
    pub fn peek(&self, key: &CacheKey, ttl: std::time::Duration) -> Option<V> {
        self.store.get(key, ttl)
    }

    /// Whether a fetch for `key` is currently pending.
    pub fn is_inflight(&self, key: &CacheKey) -> bool {
        self.inflight.contains(key)
    }

    /// Drop the stored value for one key. Other keys are untouched.
    pub fn invalidate(&self, key: &CacheKey) {
        debug!(key = %key, "invalidate");
        self.store.delete(key);
    }

    /// Drop every stored value.
    pub fn clear_all(&self) {
        debug!("clearing all cached entries");
        self.store.clear();
    }

    /// Drop stored values whose rendered key contains `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn clear_matching(&self, pattern: &str) -> usize {
        let removed = self.store.clear_matching(|k| k.as_str().contains(pattern));
        debug!(pattern, removed, "cleared matching entries");
        removed
    }

    /// Drop stored values whose key satisfies `predicate`.
    pub fn clear_matching_by<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CacheKey) -> bool,
    {
        self.store.clear_matching(predicate)
    }

    /// Forget every pending fetch.
    ///
    /// Running fetches still settle for the callers already awaiting them
    /// and still populate the store on success; the next caller for the key
    /// starts a new fetch instead of joining.
    pub fn clear_all_inflight(&self) {
        debug!(pending = self.inflight.len(), "clearing pending fetches");
        self.inflight.clear();
    }
}

impl<V> Default for FetchCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
