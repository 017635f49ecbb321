//! Per-loader timeout layer.
//!
//! Loaders carry no timeout by default. Wrap one in `TimeoutLoader` to bound
//! it; on expiry the loader fails like any other and its key gets an error
//! entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hydra_core::{CacheValue, Loader, RouteParams};

/// Error when a loader exceeds its timeout.
#[derive(Debug, Clone, thiserror::Error)]
#[error("loader '{loader}' timed out after {after:?}")]
pub struct LoaderTimeout {
    pub loader: String,
    pub after: Duration,
}

/// Loader wrapper enforcing a total timeout.
pub struct TimeoutLoader {
    inner: Arc<dyn Loader>,
    timeout: Duration,
}

impl TimeoutLoader {
    /// Wrap a loader with a timeout.
    pub fn wrap(inner: Arc<dyn Loader>, timeout: Duration) -> Arc<dyn Loader> {
        Arc::new(Self { inner, timeout })
    }
}

#[async_trait]
impl Loader for TimeoutLoader {
    async fn load(&self, params: &RouteParams) -> anyhow::Result<CacheValue> {
        match tokio::time::timeout(self.timeout, self.inner.load(params)).await {
            Ok(result) => result,
            Err(_) => Err(LoaderTimeout {
                loader: self.inner.name().to_string(),
                after: self.timeout,
            }
            .into()),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::loader_fn;

    #[tokio::test]
    async fn test_timeout_fails_slow_loader() {
        let slow = loader_fn("slow", |_p: RouteParams| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(1u32)
        });
        let loader = TimeoutLoader::wrap(slow, Duration::from_millis(20));

        let err = loader.load(&RouteParams::new()).await.unwrap_err();
        assert!(err.downcast_ref::<LoaderTimeout>().is_some());
        assert_eq!(loader.name(), "slow");
    }

    #[tokio::test]
    async fn test_timeout_passes_fast_loader() {
        let fast = loader_fn("fast", |_p: RouteParams| async move { Ok(2u32) });
        let loader = TimeoutLoader::wrap(fast, Duration::from_millis(200));

        let value = loader.load(&RouteParams::new()).await.unwrap();
        assert_eq!(value.read::<u32>().unwrap(), 2);
    }
}
