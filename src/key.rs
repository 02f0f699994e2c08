//! Canonical cache keys.
//!
//! A key is derived from an explicit resource identifier (e.g.
//! `"analytics.dashboard"`) plus an ordered list of dependency values. The
//! rendered form is the canonical JSON of `[resource, deps]`, which is
//! injective: equal inputs always give equal keys and two different
//! resources can never render to the same string.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::Result;

/// Canonical identity of a cached resource.
///
/// Cheap to clone (two `Arc<str>`s).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: Arc<str>,
    rendered: Arc<str>,
}

impl CacheKey {
    /// Key for a resource with no dependencies.
    pub fn new(resource: impl AsRef<str>) -> Self {
        let resource = resource.as_ref();
        // Serializing a `(&str, [(); 0])` pair cannot fail.
        let rendered = serde_json::to_string(&(resource, [(); 0]))
            .unwrap_or_else(|_| format!("[{resource:?},[]]"));
        Self {
            resource: Arc::from(resource),
            rendered: Arc::from(rendered),
        }
    }

    /// Resolve a key from a resource id and its dependencies.
    ///
    /// `deps` is normally a slice or tuple of primitives, e.g.
    /// `&(quiz_id, page)`. Fails only if `deps` cannot be serialized to
    /// JSON (maps with non-string keys, for instance).
    pub fn resolve<D>(resource: impl AsRef<str>, deps: &D) -> Result<Self>
    where
        D: Serialize + ?Sized,
    {
        let resource = resource.as_ref();
        let deps = serde_json::to_value(deps)?;
        let rendered = serde_json::to_string(&(resource, &deps))?;
        Ok(Self {
            resource: Arc::from(resource),
            rendered: Arc::from(rendered),
        })
    }

    /// The resource identifier this key was built from.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The full canonical key string.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
