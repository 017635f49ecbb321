//! Concurrent route data prefetch.

use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;
use hydra_core::{CacheKey, DataCache};
use hydra_router::RouteMatch;
use tracing::{debug, error, warn, Instrument};

/// Outcome of one prefetch pass.
#[derive(Debug, Clone, Default)]
pub struct PrefetchReport {
    /// Keys whose loader ran and resolved.
    pub fetched: Vec<CacheKey>,
    /// Keys whose loader ran and failed.
    pub failed: Vec<(CacheKey, String)>,
    /// Keys already present in the cache, or claimed by an earlier match.
    pub skipped: Vec<CacheKey>,
    /// Matches whose query key could not be derived from the path params.
    pub unresolved: Vec<String>,
}

impl PrefetchReport {
    /// Number of loader invocations made.
    pub fn loader_calls(&self) -> usize {
        self.fetched.len() + self.failed.len()
    }
}

/// Run every loader of the matched routes and store the results in `cache`.
///
/// A loader runs only if its key is absent from the cache, so routes that
/// share a key cause a single call. All loaders run concurrently and this
/// returns once every one of them has settled. A failing (or panicking)
/// loader stores an error entry under its own key and does not affect its
/// siblings.
pub async fn prefetch(matches: &[RouteMatch<'_>], cache: &mut DataCache) -> PrefetchReport {
    let mut report = PrefetchReport::default();
    let mut jobs = Vec::new();

    for m in matches {
        let (Some(_), Some(loader)) = (&m.route.query_key, &m.route.loader) else {
            continue;
        };

        let key = match m.cache_key() {
            Some(Ok(key)) => key,
            Some(Err(e)) => {
                warn!(route = %m.route.pattern, error = %e, "Skipping loader with unresolved query key");
                report.unresolved.push(m.route.pattern.clone());
                continue;
            }
            None => continue,
        };

        if !cache.begin(key.clone()) {
            debug!(cache_key = %key, "Cache key already present, loader skipped");
            report.skipped.push(key);
            continue;
        }

        let loader = loader.clone();
        let params = m.params.clone();
        let span = tracing::debug_span!("loader", cache_key = %key, loader = loader.name());

        jobs.push(
            async move {
                let outcome = AssertUnwindSafe(loader.load(&params)).catch_unwind().await;
                (key, outcome)
            }
            .instrument(span),
        );
    }

    for (key, outcome) in join_all(jobs).await {
        match outcome {
            Ok(Ok(value)) => {
                debug!(cache_key = %key, "Loader resolved");
                cache.resolve(key.clone(), value);
                report.fetched.push(key);
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", e);
                warn!(cache_key = %key, error = %message, "Loader failed");
                cache.reject(key.clone(), message.clone());
                report.failed.push((key, message));
            }
            Err(_) => {
                let message = "loader panicked".to_string();
                error!(cache_key = %key, "Loader panicked");
                cache.reject(key.clone(), message.clone());
                report.failed.push((key, message));
            }
        }
    }

    report
}
