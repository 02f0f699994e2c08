//! TTL-aware response store.
//!
//! [`CacheStore`] maps a [`CacheKey`] to the last successfully fetched value
//! and the instant it was stored. The time-to-live is a parameter of the
//! *read*, not of the entry: each binding passes its own `ttl`, so two
//! bindings on the same key may disagree about freshness.
//!
//! Expiry is checked lazily on read. An entry at or past its TTL is a miss;
//! there is no stale-while-revalidate. Expired entries stay in the map until
//! overwritten or cleared, which is harmless since reads ignore them.
//!
//! Timestamps use [`tokio::time::Instant`], so tests running with a paused
//! runtime clock can step through expiry with `tokio::time::advance`.

use std::time::Duration;

use tokio::time::Instant;

use crate::key::CacheKey;

/// A stored value and the instant it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Whether this entry is still fresh under `ttl` at `now`.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Thread-safe map from key to last good value.
///
/// Backed by an unbounded `moka::sync::Cache`. Capacity-based eviction is
/// deliberately not configured; entries leave only through the clear
/// operations or by being overwritten.
pub struct CacheStore<V> {
    entries: moka::sync::Cache<CacheKey, CacheEntry<V>>,
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: moka::sync::Cache::builder().build(),
        }
    }

    /// Look up a value that is still fresh under `ttl`.
    ///
    /// Returns `None` for both absent and expired entries.
    pub fn get(&self, key: &CacheKey, ttl: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        entry.is_fresh(ttl, Instant::now()).then_some(entry.value)
    }

    /// Look up the raw entry regardless of age.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Whether a fresh entry exists under `ttl`.
    pub fn contains(&self, key: &CacheKey, ttl: Duration) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.is_fresh(ttl, Instant::now()))
    }

    /// Insert or overwrite the value for `key`, stamped with the current time.
    pub fn set(&self, key: CacheKey, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove a single key.
    pub fn delete(&self, key: &CacheKey) {
        self.entries.invalidate(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.clear_matching(|_| true);
    }

    /// Remove every entry whose key satisfies `predicate`.
    ///
    /// Returns the number of keys removed.
    pub fn clear_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CacheKey) -> bool,
    {
        let doomed: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(&**key))
            .map(|(key, _)| key)
            .collect();
        for key in &doomed {
            self.entries.invalidate(&**key);
        }
        doomed.len()
    }

    /// Keys currently held, fresh or not. Order is not guaranteed.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries
            .iter()
            .map(|(key, _)| (*key).clone())
            .collect()
    }

    /// Number of entries currently held, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name)
    }

    #[tokio::test(start_paused = true)]
    async fn miss_then_hit() {
        let store = CacheStore::new();
        assert!(store.get(&key("users"), Duration::from_secs(1)).is_none());

        store.set(key("users"), 3u32);
        assert_eq!(store.get(&key("users"), Duration::from_secs(1)), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_checked_on_read() {
        let store = CacheStore::new();
        store.set(key("users"), 3u32);
        let ttl = Duration::from_millis(100);

        tokio::time::advance(Duration::from_millis(99)).await;
        assert_eq!(store.get(&key("users"), ttl), Some(3));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(store.get(&key("users"), ttl).is_none(), "now - stored_at == ttl is a miss");
        // Raw entry still present until overwritten or cleared
        assert!(store.entry(&key("users")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_is_a_read_parameter() {
        let store = CacheStore::new();
        store.set(key("stats"), "v");
        tokio::time::advance(Duration::from_millis(500)).await;

        assert!(store.contains(&key("stats"), Duration::from_secs(1)));
        assert!(!store.contains(&key("stats"), Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_refreshes_timestamp() {
        let store = CacheStore::new();
        let ttl = Duration::from_millis(100);
        store.set(key("users"), 1u32);
        tokio::time::advance(Duration::from_millis(80)).await;
        store.set(key("users"), 2u32);
        tokio::time::advance(Duration::from_millis(80)).await;
        assert_eq!(store.get(&key("users"), ttl), Some(2));
    }

    #[test]
    fn delete_only_touches_one_key() {
        let store = CacheStore::new();
        store.set(key("a"), 1u32);
        store.set(key("b"), 2u32);
        store.delete(&key("a"));
        assert!(store.entry(&key("a")).is_none());
        assert!(store.entry(&key("b")).is_some());
    }

    #[test]
    fn clear_matching_by_resource() {
        let store = CacheStore::new();
        store.set(CacheKey::resolve("analytics.daily", &[1]).unwrap(), 1u32);
        store.set(CacheKey::resolve("analytics.weekly", &[1]).unwrap(), 2u32);
        store.set(CacheKey::resolve("rewards", &[1]).unwrap(), 3u32);

        let removed = store.clear_matching(|k| k.resource().starts_with("analytics"));
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys()[0].resource(), "rewards");
    }

    #[test]
    fn clear_removes_everything() {
        let store = CacheStore::new();
        store.set(key("a"), 1u32);
        store.set(key("b"), 2u32);
        store.clear();
        assert!(store.is_empty());
    }
}
