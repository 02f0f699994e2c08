//! Core DataProvider trait

use std::future::Future;

use async_trait::async_trait;

use crate::error::BoxError;

/// A zero-argument source of data, typically one backend endpoint.
///
/// Providers are supplied by the UI layer ("fetch the analytics dashboard",
/// "fetch the reward catalogue") and know nothing about caching. Any error
/// they return is handed to callers unchanged as
/// [`FetchError::Provider`](crate::FetchError::Provider).
///
/// Closures returning a future implement this trait directly:
///
/// ```rust
/// # use quizfetch::{BoxError, DataProvider};
/// let provider = || async { Ok::<_, BoxError>(vec![1, 2, 3]) };
/// # fn assert_provider<P: DataProvider<Vec<i32>>>(_: &P) {}
/// # assert_provider(&provider);
/// ```
#[async_trait]
pub trait DataProvider<V>: Send + Sync {
    /// Fetch a fresh value.
    async fn fetch(&self) -> Result<V, BoxError>;
}

#[async_trait]
impl<V, F, Fut> DataProvider<V> for F
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<V, BoxError> {
        (self)().await
    }
}
