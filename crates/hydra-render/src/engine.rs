//! Render engine.
//!
//! Renders a resolved tree against a settled data cache. Every render gets
//! fresh style and chunk extractors. Component failures and panics are
//! contained here: the result carries the error and empty markup, and the
//! caller still assembles a valid document.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::channel::{mpsc, oneshot};
use futures::StreamExt;
use hydra_core::{CacheKey, DataCache, DataSnapshot, RequestInfo, RouteParams};
use tracing::{debug, error, warn};

use crate::chunk::{ChunkExtractor, ChunkManifest};
use crate::component::Component;
use crate::node::Node;
use crate::scope::{Navigation, RenderScope};
use crate::style::{StyleExtractor, StyleId};

/// Render failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("component '{component}' failed: {message}")]
    Component { component: String, message: String },

    #[error("unknown chunk '{0}'")]
    UnknownChunk(String),

    #[error("no component registered for element '{0}'")]
    UnknownComponent(String),

    #[error("render panicked: {0}")]
    Panicked(String),
}

impl RenderError {
    /// Component-level failure.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// One level of the matched route chain, ready to render.
#[derive(Clone)]
pub struct OutletEntry {
    /// Element name from the route entry.
    pub element: String,
    pub component: Arc<dyn Component>,
    /// Params accumulated down to this level.
    pub params: RouteParams,
    /// Resolved cache key of this level's loader, if any.
    pub cache_key: Option<CacheKey>,
}

impl std::fmt::Debug for OutletEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutletEntry")
            .field("element", &self.element)
            .field("params", &self.params)
            .field("cache_key", &self.cache_key)
            .finish()
    }
}

/// A root component plus the route chain its outlets render.
#[derive(Clone)]
pub struct RenderTree {
    pub root: Arc<dyn Component>,
    pub outlet: Vec<OutletEntry>,
}

impl std::fmt::Debug for RenderTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTree").field("outlet", &self.outlet).finish()
    }
}

impl RenderTree {
    /// Create a tree.
    pub fn new(root: Arc<dyn Component>, outlet: Vec<OutletEntry>) -> Self {
        Self { root, outlet }
    }
}

/// Output of one render pass. Consumed once by the assembler.
#[derive(Debug)]
pub struct RenderResult {
    pub markup: String,
    pub styles: StyleExtractor,
    pub chunks: ChunkExtractor,
    /// Terminal cache entries at render time.
    pub data: DataSnapshot,
    /// Redirect or navigation requested by a component.
    pub navigation: Option<Navigation>,
    /// Set when the render failed and the markup is the fallback.
    pub error: Option<RenderError>,
}

impl RenderResult {
    /// Whether the render failed.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Renders trees against a process-wide chunk manifest.
#[derive(Debug, Clone)]
pub struct RenderEngine {
    manifest: Arc<ChunkManifest>,
    existing_styles: Vec<StyleId>,
}

impl RenderEngine {
    /// Create an engine.
    pub fn new(manifest: Arc<ChunkManifest>) -> Self {
        Self {
            manifest,
            existing_styles: Vec::new(),
        }
    }

    /// Treat these style ids as already present in the document.
    pub fn with_existing_styles(mut self, ids: impl IntoIterator<Item = StyleId>) -> Self {
        self.existing_styles = ids.into_iter().collect();
        self
    }

    /// Buffered render: the complete markup in one string.
    ///
    /// `request` is `Some` on the server and `None` on the client.
    pub fn render(
        &self,
        tree: &RenderTree,
        data: &DataCache,
        request: Option<&RequestInfo>,
    ) -> RenderResult {
        let (node, mut result) = self.render_node(tree, data, request);
        result.markup = node.to_html();
        result
    }

    /// Streaming render.
    ///
    /// Segments are produced into an internal channel and released only
    /// through [`StreamingRender::all_ready`], once the whole tree has been
    /// observed by the extractors.
    pub fn render_streaming(
        &self,
        tree: &RenderTree,
        data: &DataCache,
        request: Option<&RequestInfo>,
    ) -> StreamingRender {
        let (segment_tx, segment_rx) = mpsc::unbounded();
        let (ready_tx, ready_rx) = oneshot::channel();

        let (node, result) = self.render_node(tree, data, request);
        for segment in node.into_segments() {
            // Receiver is held by the returned handle.
            let _ = segment_tx.unbounded_send(segment);
        }
        drop(segment_tx);
        let _ = ready_tx.send(result);

        StreamingRender {
            segments: segment_rx,
            ready: ready_rx,
        }
    }

    /// Degraded result for a tree that could not be built at all.
    pub fn fallback(&self, error: RenderError, data: &DataCache) -> RenderResult {
        error!(error = %error, "No tree to render, using fallback markup");
        RenderResult {
            markup: String::new(),
            styles: StyleExtractor::with_present(self.existing_styles.iter().cloned()),
            chunks: ChunkExtractor::new(self.manifest.clone()),
            data: data.snapshot(),
            navigation: None,
            error: Some(error),
        }
    }

    fn render_node(
        &self,
        tree: &RenderTree,
        data: &DataCache,
        request: Option<&RequestInfo>,
    ) -> (Node, RenderResult) {
        let pending = data.pending_keys();
        if !pending.is_empty() {
            warn!(pending = pending.len(), "Rendering with pending cache entries");
        }

        let mut styles = StyleExtractor::with_present(self.existing_styles.iter().cloned());
        let mut chunks = ChunkExtractor::new(self.manifest.clone());
        let mut navigation = None;

        let outcome = {
            let mut cx = RenderScope::new(
                data,
                request,
                &mut styles,
                &mut chunks,
                &tree.outlet,
                &mut navigation,
            );
            catch_unwind(AssertUnwindSafe(|| tree.root.render(&mut cx)))
        };

        let (node, error) = match outcome {
            Ok(Ok(node)) => (node, None),
            Ok(Err(e)) => (Node::Empty, Some(e)),
            Err(payload) => (Node::Empty, Some(RenderError::Panicked(panic_message(payload)))),
        };

        if let Some(e) = &error {
            error!(error = %e, server = request.is_some(), "Render failed, using fallback markup");
            styles = StyleExtractor::with_present(self.existing_styles.iter().cloned());
            chunks = ChunkExtractor::new(self.manifest.clone());
            navigation = None;
        } else {
            debug!(
                styles = styles.get_record().len(),
                chunks = chunks.record().len(),
                "Render complete"
            );
        }

        let result = RenderResult {
            markup: String::new(),
            styles,
            chunks,
            data: data.snapshot(),
            navigation,
            error,
        };
        (node, result)
    }
}

/// Handle to a streaming render.
#[derive(Debug)]
pub struct StreamingRender {
    segments: mpsc::UnboundedReceiver<String>,
    ready: oneshot::Receiver<RenderResult>,
}

impl StreamingRender {
    /// Wait for the all-ready signal, then flush every buffered segment as
    /// one markup string.
    pub async fn all_ready(self) -> RenderResult {
        let Self { segments, ready } = self;
        let mut result = match ready.await {
            Ok(result) => result,
            Err(_) => {
                // The render side never signalled completion.
                return RenderResult {
                    markup: String::new(),
                    styles: StyleExtractor::new(),
                    chunks: ChunkExtractor::new(Arc::new(ChunkManifest::default())),
                    data: DataSnapshot::default(),
                    navigation: None,
                    error: Some(RenderError::Panicked("render was cancelled".to_string())),
                };
            }
        };
        let segments: Vec<String> = segments.collect().await;
        result.markup = segments.concat();
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkAssets;
    use crate::component::{component, ErrorBoundary, Lazy, Outlet};
    use crate::node::el;
    use crate::style::StyleRule;

    fn manifest() -> Arc<ChunkManifest> {
        Arc::new(
            ChunkManifest::new("/static/")
                .with_chunk("x", ChunkAssets { scripts: vec!["x.js".into()], ..Default::default() })
                .with_chunk("y", ChunkAssets { scripts: vec!["y.js".into()], ..Default::default() })
                .with_chunk("z", ChunkAssets { scripts: vec!["z.js".into()], ..Default::default() }),
        )
    }

    fn leaf(text: &'static str) -> Arc<dyn Component> {
        component(move |_cx: &mut RenderScope<'_>| Ok(el("p").child(text).into()))
    }

    fn tree(root: Arc<dyn Component>) -> RenderTree {
        RenderTree::new(root, Vec::new())
    }

    #[test]
    fn test_buffered_render() {
        let engine = RenderEngine::new(manifest());
        let result = engine.render(&tree(leaf("hello")), &DataCache::new(), None);

        assert_eq!(result.markup, "<p>hello</p>");
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_chunk_record_matches_rendered_tree() {
        let root = component(|cx: &mut RenderScope<'_>| {
            let x = Lazy::new("x", leaf("x")).render(cx)?;
            let y = Lazy::new("y", leaf("y")).render(cx)?;
            let again = Lazy::new("x", leaf("x again")).render(cx)?;
            // Constructed but never rendered.
            let _z = Lazy::new("z", leaf("z"));
            Ok(Node::fragment([x, y, again]))
        });

        let result = RenderEngine::new(manifest()).render(&tree(root), &DataCache::new(), None);
        assert_eq!(result.chunks.record().ids(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_failure_yields_empty_markup() {
        let root = component(|cx: &mut RenderScope<'_>| {
            cx.style(&StyleRule::class("doomed", "color:red;"));
            cx.use_chunk("x")?;
            Err(RenderError::component("Root", "boom"))
        });

        let result = RenderEngine::new(manifest()).render(&tree(root), &DataCache::new(), None);
        assert_eq!(result.markup, "");
        assert_eq!(result.error, Some(RenderError::component("Root", "boom")));
        assert!(result.styles.get_record().is_empty());
        assert!(result.chunks.record().is_empty());
    }

    #[test]
    fn test_panic_contained() {
        let root = component(|_cx: &mut RenderScope<'_>| -> Result<Node, RenderError> {
            panic!("component bug")
        });

        let result = RenderEngine::new(manifest()).render(&tree(root), &DataCache::new(), None);
        assert_eq!(result.error, Some(RenderError::Panicked("component bug".to_string())));
    }

    #[test]
    fn test_error_boundary_renders_fallback() {
        let failing = component(|_cx: &mut RenderScope<'_>| -> Result<Node, RenderError> {
            Err(RenderError::component("Widget", "bad data"))
        });
        let root = component(move |cx: &mut RenderScope<'_>| {
            let widget = ErrorBoundary::new(failing.clone(), el("em").child("unavailable").into())
                .render(cx)?;
            Ok(el("div").child(widget).into())
        });

        let result = RenderEngine::new(manifest()).render(&tree(root), &DataCache::new(), None);
        assert_eq!(result.markup, "<div><em>unavailable</em></div>");
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_error_boundary_discards_failed_subtree_assets() {
        let failing = component(|cx: &mut RenderScope<'_>| -> Result<Node, RenderError> {
            cx.use_chunk("z")?;
            cx.style(&StyleRule::class("dead", "color:red;"));
            Err(RenderError::component("Widget", "bad data"))
        });
        let panicking = component(|cx: &mut RenderScope<'_>| -> Result<Node, RenderError> {
            cx.use_chunk("y")?;
            cx.go_to("/elsewhere");
            panic!("widget bug")
        });
        let root = component(move |cx: &mut RenderScope<'_>| {
            let kept = Lazy::new("x", leaf("kept")).render(cx)?;
            let first = ErrorBoundary::new(failing.clone(), el("em").child("a").into()).render(cx)?;
            let second = ErrorBoundary::new(panicking.clone(), el("em").child("b").into()).render(cx)?;
            Ok(el("div").child(kept).child(first).child(second).into())
        });

        let result = RenderEngine::new(manifest()).render(&tree(root), &DataCache::new(), None);

        assert_eq!(result.markup, "<div><p>kept</p><em>a</em><em>b</em></div>");
        assert_eq!(result.chunks.record().ids(), &["x".to_string()]);
        assert!(result.styles.get_record().is_empty());
        assert!(!result.chunks.get_script_tags().contains("z.js"));
        assert!(result.navigation.is_none());
    }

    #[test]
    fn test_outlet_renders_route_chain() {
        let outlet = vec![
            OutletEntry {
                element: "Layout".into(),
                component: component(|cx: &mut RenderScope<'_>| {
                    Ok(el("main").child(cx.outlet()?).into())
                }),
                params: RouteParams::new(),
                cache_key: None,
            },
            OutletEntry {
                element: "Agent".into(),
                component: component(|cx: &mut RenderScope<'_>| {
                    let id = cx.param("id").unwrap_or("?").to_string();
                    Ok(el("h1").child(id).into())
                }),
                params: [("id".to_string(), "9".to_string())].into_iter().collect(),
                cache_key: None,
            },
        ];

        let result = RenderEngine::new(manifest())
            .render(&RenderTree::new(Arc::new(Outlet), outlet), &DataCache::new(), None);
        assert_eq!(result.markup, "<main><h1>9</h1></main>");
    }

    #[test]
    fn test_existing_styles_not_reemitted() {
        let rule = StyleRule::class("title", "font-weight:bold;");
        let id = rule.id().clone();
        let root = component(move |cx: &mut RenderScope<'_>| {
            let class = cx.style(&rule);
            Ok(el("h1").class(class).into())
        });

        let engine = RenderEngine::new(manifest()).with_existing_styles([id.clone()]);
        let result = engine.render(&tree(root), &DataCache::new(), None);

        assert!(result.styles.get_record().is_empty());
        assert!(result.markup.contains(id.as_str()));
    }

    #[tokio::test]
    async fn test_streaming_flushes_after_all_ready() {
        let root = component(|cx: &mut RenderScope<'_>| {
            let header = Lazy::new("x", leaf("header")).render(cx)?;
            Ok(Node::fragment([header, leaf("body").render(cx)?]))
        });

        let engine = RenderEngine::new(manifest());
        let buffered = engine.render(&tree(root.clone()), &DataCache::new(), None);
        let streamed = engine
            .render_streaming(&tree(root), &DataCache::new(), None)
            .all_ready()
            .await;

        assert_eq!(streamed.markup, buffered.markup);
        assert_eq!(streamed.chunks.record(), buffered.chunks.record());
    }

    #[test]
    fn test_snapshot_excludes_pending() {
        let mut data = DataCache::new();
        data.begin(CacheKey::new(["slow"]));
        data.set_data(CacheKey::new(["done"]), 1u8);

        let result = RenderEngine::new(manifest()).render(&tree(leaf("x")), &data, None);
        assert_eq!(result.data.len(), 1);
    }
}
