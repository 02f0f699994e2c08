//! Per-consumer lifecycle adapter over a [`FetchCache`].
//!
//! A [`Binding`] is what a UI component holds: it knows its key, its
//! provider and its [`BindingConfig`], loads through the shared cache, and
//! publishes `{data, loading, error}` through a `watch` channel.
//!
//! # Lifecycle
//!
//! ```text
//! idle ──activate──▶ loading ──▶ ready | errored
//!                      ▲                 │
//!                      └──── refetch ────┘
//! ```
//!
//! [`deactivate`](Binding::deactivate) (or dropping the binding) clears the
//! liveness flag and removes the host-event listener. A fetch still pending
//! at that point is left running for any other binding on the same key; its
//! result is simply not applied here.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::fetcher::FetchCache;
use crate::key::CacheKey;
use crate::traits::DataProvider;
use crate::types::{BindingConfig, BindingState, HostEvent, HostEvents};

/// Builder for [`Binding`].
pub struct BindingBuilder<V> {
    cache: FetchCache<V>,
    key: CacheKey,
    provider: Arc<dyn DataProvider<V>>,
    config: BindingConfig,
    events: Option<HostEvents>,
}

impl<V> BindingBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Host event bus to listen on when `refetch_on_focus` is set.
    pub fn host_events(mut self, events: &HostEvents) -> Self {
        self.events = Some(events.clone());
        self
    }

    pub fn build(self) -> Binding<V> {
        let (state, _) = watch::channel(BindingState::default());
        Binding {
            inner: Arc::new(BindingInner {
                enabled: AtomicBool::new(self.config.enabled),
                cache: self.cache,
                key: self.key,
                provider: self.provider,
                config: self.config,
                events: self.events,
                active: AtomicBool::new(false),
                seq: AtomicU64::new(0),
                state,
                listener: Mutex::new(None),
            }),
        }
    }
}

/// One consumer's view of a cached resource.
pub struct Binding<V> {
    inner: Arc<BindingInner<V>>,
}

struct BindingInner<V> {
    cache: FetchCache<V>,
    key: CacheKey,
    provider: Arc<dyn DataProvider<V>>,
    config: BindingConfig,
    events: Option<HostEvents>,
    enabled: AtomicBool,
    active: AtomicBool,
    /// Id of the most recently started load; older loads do not publish.
    seq: AtomicU64,
    state: watch::Sender<BindingState<V>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Binding<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn builder(
        cache: &FetchCache<V>,
        key: CacheKey,
        provider: Arc<dyn DataProvider<V>>,
    ) -> BindingBuilder<V> {
        BindingBuilder {
            cache: cache.clone(),
            key,
            provider,
            config: BindingConfig::default(),
            events: None,
        }
    }

    /// Shorthand for a binding without host events.
    pub fn new(
        cache: &FetchCache<V>,
        key: CacheKey,
        provider: Arc<dyn DataProvider<V>>,
        config: BindingConfig,
    ) -> Self {
        Self::builder(cache, key, provider).config(config).build()
    }

    /// Mark the binding live and, if configured, perform the initial load.
    ///
    /// Resolves once the initial load has settled (or immediately when
    /// disabled or `fetch_on_activate` is off). Calling it on an already
    /// active binding only repeats the initial load.
    pub async fn activate(&self) {
        let was_active = self.inner.active.swap(true, Ordering::SeqCst);
        if !was_active && self.inner.config.refetch_on_focus {
            self.start_listener();
        }
        if self.inner.config.fetch_on_activate {
            self.inner.load(false).await;
        }
    }

    /// Stop applying results and stop listening for host events.
    ///
    /// Does not cancel a pending shared fetch.
    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    /// Reload through the cache. `force_refresh` bypasses the stored value.
    pub async fn refetch(&self, force_refresh: bool) {
        self.inner.load(force_refresh).await;
    }

    /// Forced reload, the default refetch behaviour.
    pub async fn refetch_default(&self) {
        self.refetch(true).await;
    }

    /// Remove this binding's key from the store. Other keys are untouched.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate(&self.inner.key);
    }

    /// The host window regained focus.
    pub async fn on_focus_regained(&self) {
        self.inner.on_host_event(HostEvent::FocusRegained).await;
    }

    /// The host tab became visible.
    pub async fn on_visible(&self) {
        self.inner.on_host_event(HostEvent::Visible).await;
    }

    /// Enable or disable loading.
    ///
    /// Re-enabling an active binding with `fetch_on_activate` loads
    /// immediately, as if it had just been activated.
    pub async fn set_enabled(&self, enabled: bool) {
        let was = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was && self.is_active() && self.inner.config.fetch_on_activate {
            self.inner.load(false).await;
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> BindingState<V> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<BindingState<V>> {
        self.inner.state.subscribe()
    }

    /// State changes as a stream, starting with the current state.
    pub fn stream(&self) -> WatchStream<BindingState<V>> {
        WatchStream::new(self.subscribe())
    }

    pub fn key(&self) -> &CacheKey {
        &self.inner.key
    }

    pub fn config(&self) -> &BindingConfig {
        &self.inner.config
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    fn start_listener(&self) {
        let Some(events) = &self.inner.events else {
            return;
        };
        let mut rx = events.subscribe();
        let weak: Weak<BindingInner<V>> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.on_host_event(event).await;
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let mut slot = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }
}

impl<V> BindingInner<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn load(&self, force_refresh: bool) {
        if !self.enabled.load(Ordering::SeqCst) || !self.active.load(Ordering::SeqCst) {
            return;
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.begin_load());

        let options = self.config.load_options(force_refresh);
        let result = self
            .cache
            .load(&self.key, self.provider.clone(), &options)
            .await;

        if !self.active.load(Ordering::SeqCst) {
            debug!(key = %self.key, "binding inactive, dropping result");
            return;
        }
        if self.seq.load(Ordering::SeqCst) != seq {
            debug!(key = %self.key, "superseded by a newer load");
            return;
        }
        self.state.send_modify(|s| s.settle(result));
    }

    async fn on_host_event(&self, event: HostEvent) {
        if !self.config.refetch_on_focus {
            return;
        }
        debug!(key = %self.key, ?event, "host event, refetching");
        self.load(false).await;
    }
}

impl<V> BindingInner<V> {
    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            handle.abort();
        }
    }
}

impl<V> Drop for Binding<V> {
    fn drop(&mut self) {
        self.inner.deactivate();
    }
}
