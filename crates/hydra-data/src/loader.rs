//! Loader adapters.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use hydra_core::{CacheValue, Loader, RouteParams};
use serde::Serialize;

/// Loader built from an async closure.
pub struct FnLoader<F, T> {
    name: String,
    f: F,
    _marker: PhantomData<fn() -> T>,
}

/// Build a loader from an async closure returning a serializable value.
///
/// ```rust,ignore
/// let loader = loader_fn("agent", |params| async move {
///     let id = params.get("id").cloned().unwrap_or_default();
///     Ok(Agent::fetch(&id).await?)
/// });
/// ```
pub fn loader_fn<F, Fut, T>(name: impl Into<String>, f: F) -> Arc<dyn Loader>
where
    F: Fn(RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + Sync + 'static,
{
    Arc::new(FnLoader {
        name: name.into(),
        f,
        _marker: PhantomData,
    })
}

#[async_trait]
impl<F, Fut, T> Loader for FnLoader<F, T>
where
    F: Fn(RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + Sync + 'static,
{
    async fn load(&self, params: &RouteParams) -> anyhow::Result<CacheValue> {
        let value = (self.f)(params.clone()).await?;
        Ok(CacheValue::new(value))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
