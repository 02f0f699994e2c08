//! Registry of pending fetches, used to coalesce concurrent callers.
//!
//! Every key maps to at most one [`SharedFetch`]. The first caller for a key
//! registers the fetch; later callers clone the shared handle and await the
//! same settlement. Lookup and insertion happen under a single lock in
//! [`InflightRegistry::get_or_register`], so two callers can never both
//! observe "no entry" for the same key.
//!
//! Entries carry a generation number. [`InflightGuard`] removes its entry
//! when dropped, but only if the generation still matches, so a fetch that
//! settles after [`InflightRegistry::clear`] cannot evict the newer fetch
//! registered in its place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, Shared};

use crate::Result;
use crate::key::CacheKey;

/// A pending fetch that any number of callers can await.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A registered pending fetch.
#[derive(Clone)]
pub struct InflightEntry<V> {
    pub fetch: SharedFetch<V>,
    pub generation: u64,
}

/// Outcome of [`InflightRegistry::get_or_register`].
pub enum Slot<V> {
    /// Another caller already started this fetch.
    Joined(SharedFetch<V>),
    /// This caller registered a new fetch.
    Started(SharedFetch<V>),
}

impl<V> Slot<V> {
    pub fn into_fetch(self) -> SharedFetch<V> {
        match self {
            Slot::Joined(f) | Slot::Started(f) => f,
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, Slot::Joined(_))
    }
}

struct RegistryState<V> {
    entries: HashMap<CacheKey, InflightEntry<V>>,
    next_generation: u64,
}

/// Thread-safe map from key to pending fetch.
pub struct InflightRegistry<V> {
    state: Mutex<RegistryState<V>>,
}

impl<V> InflightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, RegistryState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The pending fetch for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<SharedFetch<V>> {
        self.lock().entries.get(key).map(|e| e.fetch.clone())
    }

    /// Register `fetch` for `key`, replacing any existing entry.
    ///
    /// Returns the generation assigned to the new entry.
    pub fn register(&self, key: CacheKey, fetch: SharedFetch<V>) -> u64 {
        let mut state = self.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        state
            .entries
            .insert(key, InflightEntry { fetch, generation });
        generation
    }

    /// Join the pending fetch for `key`, or register a new one built by
    /// `start` if none exists.
    ///
    /// `start` receives the generation of the entry being created and runs
    /// while the registry lock is held. It must not block or call back into
    /// the registry.
    pub fn get_or_register<F>(&self, key: &CacheKey, start: F) -> Slot<V>
    where
        F: FnOnce(u64) -> SharedFetch<V>,
    {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get(key) {
            return Slot::Joined(entry.fetch.clone());
        }
        let generation = state.next_generation;
        state.next_generation += 1;
        let fetch = start(generation);
        state.entries.insert(
            key.clone(),
            InflightEntry {
                fetch: fetch.clone(),
                generation,
            },
        );
        Slot::Started(fetch)
    }

    /// Remove the entry for `key` if it still has `generation`.
    ///
    /// Returns whether an entry was removed.
    pub fn unregister(&self, key: &CacheKey, generation: u64) -> bool {
        let mut state = self.lock();
        match state.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                state.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Forget every pending fetch.
    ///
    /// Fetches already running keep running and still deliver their result
    /// to callers already awaiting them; new callers start fresh fetches.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for InflightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a registry entry when dropped.
///
/// Held by the task running a fetch so that cleanup happens on success,
/// failure, timeout and panic alike.
pub struct InflightGuard<V>
where
    V: Clone + Send + Sync + 'static,
{
    registry: Arc<InflightRegistry<V>>,
    key: CacheKey,
    generation: u64,
}

impl<V> InflightGuard<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(registry: Arc<InflightRegistry<V>>, key: CacheKey, generation: u64) -> Self {
        Self {
            registry,
            key,
            generation,
        }
    }
}

impl<V> Drop for InflightGuard<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.registry.unregister(&self.key, self.generation);
    }
}
