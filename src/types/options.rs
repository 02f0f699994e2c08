//! Binding and load configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time-to-live for cached entries: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default provider timeout: 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Per-binding configuration.
///
/// Durations serialize as integer milliseconds (`ttl_ms`, `timeout_ms`), the
/// same unit the config file uses.
///
/// ```rust
/// # use quizfetch::BindingConfig;
/// # use std::time::Duration;
/// let config = BindingConfig::new()
///     .ttl(Duration::from_secs(60))
///     .refetch_on_focus(true);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// How long a stored value counts as fresh. Default: 300,000ms.
    #[serde(rename = "ttl_ms", with = "millis")]
    pub ttl: Duration,
    /// When false the binding never loads. Default: true.
    pub enabled: bool,
    /// Reload (not forced) when the host window regains focus or the tab
    /// becomes visible. Default: false.
    pub refetch_on_focus: bool,
    /// Load as soon as the binding is activated. Default: true.
    pub fetch_on_activate: bool,
    /// Provider timeout. Default: 10,000ms.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            enabled: true,
            refetch_on_focus: false,
            fetch_on_activate: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn refetch_on_focus(mut self, refetch: bool) -> Self {
        self.refetch_on_focus = refetch;
        self
    }

    pub fn fetch_on_activate(mut self, fetch: bool) -> Self {
        self.fetch_on_activate = fetch;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Options for a single load under this configuration.
    pub fn load_options(&self, force_refresh: bool) -> LoadOptions {
        LoadOptions {
            ttl: self.ttl,
            timeout: self.timeout,
            force_refresh,
        }
    }
}

/// Options for one [`FetchCache::load`](crate::FetchCache::load) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Freshness window for the store lookup.
    pub ttl: Duration,
    /// How long to wait for the provider before failing with a timeout.
    pub timeout: Duration,
    /// Skip the store lookup. Concurrent callers are still coalesced.
    pub force_refresh: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
            force_refresh: false,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

/// Serde adapter for `Duration` as whole milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
