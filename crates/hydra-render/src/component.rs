//! Components and the built-in boundaries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::engine::RenderError;
use crate::node::Node;
use crate::scope::RenderScope;

/// A renderable unit.
///
/// The same component renders on the server and on the client; it must
/// produce the same markup given the same cache contents.
pub trait Component: Send + Sync {
    /// Render into a node.
    fn render(&self, cx: &mut RenderScope<'_>) -> Result<Node, RenderError>;
}

impl<F> Component for F
where
    F: Fn(&mut RenderScope<'_>) -> Result<Node, RenderError> + Send + Sync,
{
    fn render(&self, cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
        self(cx)
    }
}

/// Wrap a closure as a shared component.
pub fn component<F>(f: F) -> Arc<dyn Component>
where
    F: Fn(&mut RenderScope<'_>) -> Result<Node, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Renders the next level of the matched route chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outlet;

impl Component for Outlet {
    fn render(&self, cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
        cx.outlet()
    }
}

/// Recoverable boundary: a failing or panicking subtree renders `fallback`
/// and the rest of the page is unaffected.
///
/// Styles, chunks and navigation recorded by the failed subtree are
/// discarded along with its markup.
pub struct ErrorBoundary {
    inner: Arc<dyn Component>,
    fallback: Node,
}

impl ErrorBoundary {
    /// Create a boundary.
    pub fn new(inner: Arc<dyn Component>, fallback: Node) -> Self {
        Self { inner, fallback }
    }
}

impl Component for ErrorBoundary {
    fn render(&self, cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
        let checkpoint = cx.checkpoint();
        match catch_unwind(AssertUnwindSafe(|| self.inner.render(cx))) {
            Ok(Ok(node)) => Ok(node),
            Ok(Err(e)) => {
                warn!(error = %e, "Subtree failed, rendering fallback");
                cx.rollback(checkpoint);
                Ok(self.fallback.clone())
            }
            Err(_) => {
                warn!("Subtree panicked, rendering fallback");
                cx.rollback(checkpoint);
                Ok(self.fallback.clone())
            }
        }
    }
}

/// Code-split boundary. Records `chunk` when, and only when, the wrapped
/// component renders.
pub struct Lazy {
    chunk: String,
    inner: Arc<dyn Component>,
}

impl Lazy {
    /// Create a lazy boundary.
    pub fn new(chunk: impl Into<String>, inner: Arc<dyn Component>) -> Self {
        Self {
            chunk: chunk.into(),
            inner,
        }
    }

    /// Chunk id.
    pub fn chunk(&self) -> &str {
        &self.chunk
    }
}

impl Component for Lazy {
    fn render(&self, cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
        cx.use_chunk(&self.chunk)?;
        self.inner.render(cx)
    }
}
