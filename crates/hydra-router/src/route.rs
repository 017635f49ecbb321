//! Route entries.

use std::fmt;
use std::sync::Arc;

use hydra_core::{CacheKey, Loader, RouteParams};
use serde::{Deserialize, Serialize};

/// Error deriving a cache key from a query key template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("query key segment ':{0}' has no matching path parameter")]
    MissingParam(String),
}

/// Query key template declared on a route.
///
/// Segments starting with `:` are substituted from the matched path
/// parameters, so `["agent", ":id"]` on `/agents/7` becomes the cache key
/// `["agent", "7"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Create a query key template.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Template segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Derive the concrete cache key for a set of path parameters.
    pub fn resolve(&self, params: &RouteParams) -> Result<CacheKey, RouteError> {
        let segments = self
            .0
            .iter()
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RouteError::MissingParam(name.to_string())),
                None => Ok(segment.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CacheKey::new(segments))
    }
}

/// A single entry in the route table.
///
/// Immutable after process start. `element` names the component the
/// application's registry renders for this entry.
#[derive(Clone)]
pub struct RouteEntry {
    /// Path pattern relative to the parent (e.g. `"agents/:id"`).
    pub pattern: String,
    /// Component name rendered for this route.
    pub element: String,
    /// Cache key template for the loader result.
    pub query_key: Option<QueryKey>,
    /// Data loader.
    pub loader: Option<Arc<dyn Loader>>,
    /// Nested routes, tried in declaration order.
    pub children: Vec<RouteEntry>,
}

impl RouteEntry {
    /// Create a route entry.
    pub fn new(pattern: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            element: element.into(),
            query_key: None,
            loader: None,
            children: Vec::new(),
        }
    }

    /// Set the query key template.
    pub fn with_query_key(mut self, key: QueryKey) -> Self {
        self.query_key = Some(key);
        self
    }

    /// Set the loader.
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Add a nested route.
    pub fn child(mut self, child: RouteEntry) -> Self {
        self.children.push(child);
        self
    }

    /// Whether this entry takes part in prefetching.
    pub fn is_loadable(&self) -> bool {
        self.query_key.is_some() && self.loader.is_some()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("element", &self.element)
            .field("query_key", &self.query_key)
            .field("loader", &self.loader.as_ref().map(|l| l.name().to_string()))
            .field("children", &self.children)
            .finish()
    }
}
