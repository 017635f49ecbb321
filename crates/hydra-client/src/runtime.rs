//! The running client application.

use std::sync::Arc;

use hydra_core::DataCache;
use hydra_data::prefetch;
use hydra_render::{Application, Navigation, RenderEngine, RenderError, RenderResult, RouteStatus, StyleId};
use tracing::{debug, warn};

use crate::dom::Dom;

/// Result of a client-side navigation.
#[derive(Debug, Clone)]
pub struct NavigationOutcome {
    pub status: RouteStatus,
    /// Loader invocations made for this navigation.
    pub loader_calls: usize,
    /// Chunks loaded for the first time.
    pub new_chunks: Vec<String>,
    /// Further navigation a component requested.
    pub navigation: Option<String>,
    /// Render failure, if the new route failed to render.
    pub error: Option<RenderError>,
}

/// Client state after boot.
///
/// Owns the live data cache restored from the document. Navigation reuses
/// it, so a key the server already loaded is never fetched again.
pub struct ClientRuntime {
    app: Arc<Application>,
    root_id: String,
    cache: DataCache,
    styles: Vec<StyleId>,
    chunks: Vec<String>,
    location: String,
}

impl ClientRuntime {
    pub(crate) fn new(
        app: Arc<Application>,
        root_id: String,
        styles: impl IntoIterator<Item = StyleId>,
        chunks: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            app,
            root_id,
            cache: DataCache::new(),
            styles: styles.into_iter().collect(),
            chunks: chunks.into_iter().collect(),
            location: String::new(),
        }
    }

    /// Engine that skips styles already in the document.
    pub(crate) fn engine(&self) -> RenderEngine {
        self.app.engine().with_existing_styles(self.styles.iter().cloned())
    }

    /// Insert a render's new styles and note its new chunks.
    pub(crate) fn absorb<D: Dom>(&mut self, dom: &mut D, result: &RenderResult) -> Vec<String> {
        dom.append_head(&result.styles.to_markup());
        self.styles.extend(result.styles.get_record().ids().iter().cloned());

        let mut fresh = Vec::new();
        for id in result.chunks.record().ids() {
            if !self.chunks.contains(id) {
                self.chunks.push(id.clone());
                fresh.push(id.clone());
            }
        }
        if !fresh.is_empty() {
            debug!(chunks = ?fresh, "Loading chunks");
        }
        fresh
    }

    pub(crate) fn settle(&mut self, location: &str, cache: DataCache) {
        self.location = location.to_string();
        self.cache = cache;
    }

    /// The live data cache.
    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    /// Mutable access to the live cache, e.g. to set data after a mutation
    /// or invalidate a key before [`refresh`](Self::refresh).
    pub fn cache_mut(&mut self) -> &mut DataCache {
        &mut self.cache
    }

    /// Current location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Chunks loaded so far, server-rendered ones first.
    pub fn loaded_chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Style ids present in the document.
    pub fn present_styles(&self) -> &[StyleId] {
        &self.styles
    }

    /// Navigate to `path` and render it into the root.
    pub async fn navigate<D: Dom>(&mut self, dom: &mut D, path: &str) -> NavigationOutcome {
        let app = self.app.clone();

        let (result, status, loader_calls) = match app.resolve(path) {
            Ok(resolution) => {
                let report = prefetch(&resolution.matches, &mut self.cache).await;
                let result = self.engine().render(&resolution.tree, &self.cache, None);
                (result, resolution.status, report.loader_calls())
            }
            Err(e) => {
                warn!(error = %e, path, "Client could not resolve path");
                let result = self.engine().fallback(e, &self.cache);
                (result, RouteStatus::NotFound, 0)
            }
        };

        if !dom.set_root_html(&self.root_id, &result.markup) {
            warn!(root_id = %self.root_id, "Root element missing, nothing rendered");
        }
        let new_chunks = self.absorb(dom, &result);
        self.location = path.to_string();

        NavigationOutcome {
            status,
            loader_calls,
            new_chunks,
            navigation: result.navigation.as_ref().map(Navigation::target).map(str::to_string),
            error: result.error,
        }
    }

    /// Re-render the current location against the live cache.
    pub async fn refresh<D: Dom>(&mut self, dom: &mut D) -> NavigationOutcome {
        let location = self.location.clone();
        self.navigate(dom, &location).await
    }
}
