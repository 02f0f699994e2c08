//! Configuration file loading.
//!
//! Binding defaults can be tuned per deployment without recompiling.
//! Configuration is loaded from TOML with the following resolution order:
//! 1. explicit path (e.g. a `--config <path>` CLI flag)
//! 2. `~/.quizfetch/config.toml` (user)
//!
//! When neither exists, [`CacheSettings::default()`] is used.
//!
//! ```toml
//! [defaults]
//! ttl_ms = 300000
//! timeout_ms = 10000
//!
//! [resources."analytics.dashboard"]
//! ttl_ms = 60000
//! refetch_on_focus = true
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::BindingConfig;
use crate::{FetchError, Result};

/// Loaded cache settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Applied to every binding unless a resource override says otherwise.
    #[serde(default)]
    pub defaults: BindingConfig,
    /// Per-resource overrides, keyed on resource identifier.
    #[serde(default)]
    pub resources: HashMap<String, ResourceOverride>,
}

/// Partial [`BindingConfig`]; unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceOverride {
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub refetch_on_focus: Option<bool>,
    #[serde(default)]
    pub fetch_on_activate: Option<bool>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ResourceOverride {
    fn apply(&self, mut config: BindingConfig) -> BindingConfig {
        if let Some(ms) = self.ttl_ms {
            config.ttl = Duration::from_millis(ms);
        }
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(refetch) = self.refetch_on_focus {
            config.refetch_on_focus = refetch;
        }
        if let Some(fetch) = self.fetch_on_activate {
            config.fetch_on_activate = fetch;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        config
    }
}

impl CacheSettings {
    /// Load settings from the standard locations.
    ///
    /// An explicit path must exist. Without one, the user config is used if
    /// present, otherwise defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FetchError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            FetchError::Configuration(msg) => {
                FetchError::Configuration(format!("Failed to parse config file {path:?}: {msg}"))
            }
            other => other,
        })
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| FetchError::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Effective configuration for `resource`: defaults with any override applied.
    pub fn binding_config(&self, resource: &str) -> BindingConfig {
        match self.resources.get(resource) {
            Some(o) => o.apply(self.defaults.clone()),
            None => self.defaults.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.defaults.timeout.is_zero() {
            return Err(FetchError::Configuration(
                "defaults.timeout_ms must be greater than zero".to_string(),
            ));
        }
        for (name, o) in &self.resources {
            if o.timeout_ms == Some(0) {
                return Err(FetchError::Configuration(format!(
                    "resources.{name}.timeout_ms must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(FetchError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".quizfetch").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}
