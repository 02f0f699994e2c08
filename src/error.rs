//! quizfetch error types

use std::sync::Arc;
use std::time::Duration;

/// Boxed error returned by data providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the fetch cache.
///
/// Cloneable so that a single settled fetch can hand the same error to
/// every coalesced waiter. Provider errors are shared behind an `Arc`, so
/// all waiters observe the identical underlying error value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Whatever the provider returned, passed through unchanged.
    #[error("provider error: {0}")]
    Provider(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The provider did not settle before the configured timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The spawned fetch task panicked or was cancelled by the runtime.
    #[error("fetch aborted: {0}")]
    Aborted(String),

    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of a [`FetchError`], for diagnostics and UI
/// branching (e.g. "show a retry button" vs "show a slow-network hint").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Provider,
    Timeout,
    Aborted,
    InvalidKey,
    Configuration,
}

impl ErrorKind {
    /// Stable lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Provider => "provider",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Aborted => "aborted",
            ErrorKind::InvalidKey => "invalid_key",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl FetchError {
    /// Wrap a provider error.
    pub fn provider(err: impl Into<BoxError>) -> Self {
        FetchError::Provider(Arc::from(err.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Provider(_) => ErrorKind::Provider,
            FetchError::Timeout(_) => ErrorKind::Timeout,
            FetchError::Aborted(_) => ErrorKind::Aborted,
            FetchError::InvalidKey(_) => ErrorKind::InvalidKey,
            FetchError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }

    /// Borrow the provider's original error, if this is a provider failure.
    pub fn provider_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            FetchError::Provider(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Whether two errors describe the same settled outcome.
    ///
    /// Coalesced waiters receive clones of one settled result. Provider
    /// errors compare the shared allocation rather than the message, so two
    /// independent failures with equal text differ. Timeouts carry no
    /// allocation and compare by duration: any two timeouts of equal length
    /// match, whether or not they came from the same fetch. Other kinds
    /// never match.
    pub fn same_outcome(&self, other: &FetchError) -> bool {
        match (self, other) {
            (FetchError::Provider(a), FetchError::Provider(b)) => Arc::ptr_eq(a, b),
            (FetchError::Timeout(a), FetchError::Timeout(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::InvalidKey(err.to_string())
    }
}

/// Result type alias for quizfetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
