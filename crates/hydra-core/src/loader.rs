//! Data-loading seam consumed from the route table.

use async_trait::async_trait;

use crate::cache::CacheValue;
use crate::context::RouteParams;

/// A route's data loader.
///
/// Loaders are defined once at process start and shared read-only by every
/// request. A loader must not keep per-request state between calls.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load the data for the given resolved path parameters.
    async fn load(&self, params: &RouteParams) -> anyhow::Result<CacheValue>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
