//! Per-render scope handed to components.

use hydra_core::{CacheKey, DataCache, RequestInfo};
use serde::de::DeserializeOwned;

use crate::chunk::ChunkExtractor;
use crate::engine::{OutletEntry, RenderError};
use crate::node::Node;
use crate::style::{StyleExtractor, StyleRule};

/// State of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Query<T> {
    /// Loader resolved and the value decoded as `T`.
    Ready(T),
    /// Loader failed, or the value did not decode as `T`.
    Failed(String),
    /// No terminal entry for the key.
    Missing,
}

impl<T> Query<T> {
    /// The value, if ready.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the value is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Navigation requested during render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Server side: answer with a redirect.
    Redirect(String),
    /// Client side: navigate the running app.
    Navigate(String),
}

impl Navigation {
    /// Target path.
    pub fn target(&self) -> &str {
        match self {
            Self::Redirect(path) | Self::Navigate(path) => path,
        }
    }
}

/// Render-side effects recorded up to some point, see
/// [`RenderScope::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct ScopeCheckpoint {
    styles: usize,
    chunks: usize,
    navigated: bool,
}

/// What a component sees while rendering.
///
/// `request` is the capability that tells server from client: it is only
/// present when rendering for an incoming request.
pub struct RenderScope<'a> {
    data: &'a DataCache,
    request: Option<&'a RequestInfo>,
    styles: &'a mut StyleExtractor,
    chunks: &'a mut ChunkExtractor,
    current: Option<&'a OutletEntry>,
    rest: &'a [OutletEntry],
    navigation: &'a mut Option<Navigation>,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(
        data: &'a DataCache,
        request: Option<&'a RequestInfo>,
        styles: &'a mut StyleExtractor,
        chunks: &'a mut ChunkExtractor,
        outlet: &'a [OutletEntry],
        navigation: &'a mut Option<Navigation>,
    ) -> Self {
        Self {
            data,
            request,
            styles,
            chunks,
            current: None,
            rest: outlet,
            navigation,
        }
    }

    /// Read a cache entry as `T`.
    pub fn query<T>(&self, key: &CacheKey) -> Query<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        if let Some(message) = self.data.error(key) {
            return Query::Failed(message.to_string());
        }
        match self.data.data::<T>(key) {
            Some(Ok(value)) => Query::Ready(value),
            Some(Err(e)) => Query::Failed(e.to_string()),
            None => Query::Missing,
        }
    }

    /// Read the current route's loader result.
    pub fn route_data<T>(&self) -> Query<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        match self.current.and_then(|entry| entry.cache_key.as_ref()) {
            Some(key) => self.query(key),
            None => Query::Missing,
        }
    }

    /// A path parameter of the current route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.current
            .and_then(|entry| entry.params.get(name))
            .map(String::as_str)
    }

    /// Insert a style rule and return its class name.
    pub fn style(&mut self, rule: &StyleRule) -> String {
        self.styles.insert(rule);
        rule.id().to_string()
    }

    /// Record that a code-split chunk is needed by this render.
    pub fn use_chunk(&mut self, id: &str) -> Result<(), RenderError> {
        self.chunks.add_chunk(id).map(|_| ())
    }

    /// Render the next level of the matched route chain.
    ///
    /// Renders nothing when the chain is exhausted.
    pub fn outlet(&mut self) -> Result<Node, RenderError> {
        let Some((entry, rest)) = self.rest.split_first() else {
            return Ok(Node::Empty);
        };
        let mut child = RenderScope {
            data: self.data,
            request: self.request,
            styles: &mut *self.styles,
            chunks: &mut *self.chunks,
            current: Some(entry),
            rest,
            navigation: &mut *self.navigation,
        };
        entry.component.render(&mut child)
    }

    /// Mark the styles, chunks and navigation recorded so far.
    pub fn checkpoint(&self) -> ScopeCheckpoint {
        ScopeCheckpoint {
            styles: self.styles.checkpoint(),
            chunks: self.chunks.checkpoint(),
            navigated: self.navigation.is_some(),
        }
    }

    /// Discard what was recorded after `checkpoint`, for a subtree whose
    /// markup is thrown away.
    pub fn rollback(&mut self, checkpoint: ScopeCheckpoint) {
        self.styles.rollback(checkpoint.styles);
        self.chunks.rollback(checkpoint.chunks);
        if !checkpoint.navigated {
            *self.navigation = None;
        }
    }

    /// The incoming request, when rendering on the server.
    pub fn request(&self) -> Option<&RequestInfo> {
        self.request
    }

    /// Whether this render serves an incoming request.
    pub fn is_server(&self) -> bool {
        self.request.is_some()
    }

    /// Send the user elsewhere: a redirect on the server, a navigation on
    /// the client. The first call wins. Returns an empty node to render in
    /// place of the component.
    pub fn go_to(&mut self, path: impl Into<String>) -> Node {
        if self.navigation.is_none() {
            let path = path.into();
            *self.navigation = Some(if self.is_server() {
                Navigation::Redirect(path)
            } else {
                Navigation::Navigate(path)
            });
        }
        Node::Empty
    }
}
