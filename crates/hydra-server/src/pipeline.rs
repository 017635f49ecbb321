//! The per-request SSR pipeline.

use std::fmt::Display;
use std::sync::Arc;

use futures::Sink;
use http::StatusCode;
use hydra_core::{AppConfig, LifecycleObserver, LifecyclePhase, RenderMode, RequestContext, RequestId};
use hydra_data::prefetch;
use hydra_render::{Application, ChunkManifest, Navigation, RenderResult, RouteStatus};
use hydra_snapshot::{serialize, serialize_chunk_ids, serialize_style_ids, SsrFlag};
use hydra_streaming::{assemble, DocumentParts, HeadContent, StreamWriter};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::HydraError;
use crate::response::{PreparedResponse, ResponseOutcome, ResponseSummary};

const EMPTY_DATA_PAYLOAD: &str = r#"{"queries":[]}"#;

/// Runs requests through match, prefetch, render, dehydrate, assemble and
/// write.
///
/// Holds only process-wide, read-only state. Everything request-scoped
/// lives in the `RequestContext` passed to each call.
#[derive(Clone)]
pub struct SsrPipeline {
    app: Arc<Application>,
    config: AppConfig,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl SsrPipeline {
    /// Create a pipeline.
    pub fn new(app: Arc<Application>, config: AppConfig) -> Self {
        Self {
            app,
            config,
            observer: None,
        }
    }

    /// Create a pipeline, loading the chunk manifest named by the config.
    ///
    /// Fails on an invalid config, an unreadable or inconsistent manifest,
    /// or a route whose element has no registered component.
    pub fn from_config(app: Application, config: AppConfig) -> Result<Self, HydraError> {
        config.validate()?;

        let app = match &config.assets.manifest {
            Some(path) => {
                let mut manifest = ChunkManifest::load(path)?;
                if manifest.public_path.is_empty() {
                    manifest.public_path = config.assets.public_path.clone();
                }
                if let Some(problem) = manifest.validate().into_iter().next() {
                    return Err(problem.into());
                }
                app.with_manifest(Arc::new(manifest))
            }
            None => app,
        };

        if let Some(missing) = app.validate().into_iter().next() {
            return Err(missing.into());
        }

        Ok(Self::new(Arc::new(app), config))
    }

    /// Attach a lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The application.
    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// The configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Render a request into a complete response.
    ///
    /// Never fails: loader failures become error entries, render failures
    /// become a degraded document that tells the client to cold-start.
    pub async fn render(&self, ctx: &mut RequestContext) -> PreparedResponse {
        if let Some(id) = ctx.header("x-request-id").map(str::to_string) {
            ctx.request_id = RequestId::from_string(id);
        }

        let span = info_span!(
            "ssr_request",
            request_id = %ctx.request_id,
            path = %ctx.path,
        );
        self.render_inner(ctx).instrument(span).await
    }

    async fn render_inner(&self, ctx: &mut RequestContext) -> PreparedResponse {
        self.notify(ctx, LifecyclePhase::Start);
        let engine = self.app.engine();

        let (result, status) = match self.app.resolve(&ctx.path) {
            Ok(resolution) => {
                let report = prefetch(&resolution.matches, &mut ctx.cache).await;
                debug!(
                    fetched = report.fetched.len(),
                    failed = report.failed.len(),
                    skipped = report.skipped.len(),
                    "Prefetch complete"
                );
                ctx.timing.mark("prefetch_done");
                self.notify(ctx, LifecyclePhase::Prefetched);

                let info = ctx.info();
                let result = match self.config.render.mode {
                    RenderMode::Buffered => engine.render(&resolution.tree, &ctx.cache, Some(&info)),
                    RenderMode::Streaming => {
                        engine
                            .render_streaming(&resolution.tree, &ctx.cache, Some(&info))
                            .all_ready()
                            .await
                    }
                };
                let status = match resolution.status {
                    RouteStatus::Matched => StatusCode::OK,
                    RouteStatus::NotFound => StatusCode::NOT_FOUND,
                };
                (result, status)
            }
            Err(e) => (engine.fallback(e, &ctx.cache), StatusCode::INTERNAL_SERVER_ERROR),
        };
        ctx.timing.mark("render_done");
        self.notify(ctx, LifecyclePhase::Rendered);

        if let Some(Navigation::Redirect(location)) = &result.navigation {
            match PreparedResponse::redirect(location, &ctx.request_id) {
                Some(response) => {
                    info!(location = %location, "Redirecting");
                    ctx.redirect = Some(location.clone());
                    return response;
                }
                None => warn!(location = %location, "Ignoring redirect to invalid location"),
            }
        }

        let degraded = result.is_degraded();
        if let Some(e) = &result.error {
            self.notify(ctx, LifecyclePhase::Error(e.to_string()));
        }

        let body = self.document(ctx, &result);
        info!(status = status.as_u16(), degraded, bytes = body.len(), "Document assembled");

        let mut response = PreparedResponse::html(status, &ctx.request_id, body);
        response.degraded = degraded;
        response
    }

    /// Dehydrate the render result and assemble the document.
    fn document(&self, ctx: &mut RequestContext, result: &RenderResult) -> String {
        let data_json = match serialize(&result.data) {
            Ok(data) => data.json,
            Err(e) => {
                warn!(error = %e, "Data snapshot failed, shipping empty payload");
                EMPTY_DATA_PAYLOAD.to_string()
            }
        };
        ctx.dehydrated = Some(data_json.clone());

        let flag = if result.is_degraded() {
            SsrFlag::degraded()
        } else {
            SsrFlag::server_rendered()
        };

        let mut style_tags = result.styles.to_markup();
        style_tags.push_str(&result.chunks.get_style_tags());

        let document = &self.config.document;
        let parts = DocumentParts {
            lang: document.lang.clone(),
            head: HeadContent::from_config(document),
            chunk_links: result.chunks.get_link_tags(),
            style_tags,
            root_id: document.root_id.clone(),
            markup: result.markup.clone(),
            flag_json: payload_or(flag.to_json(), "{}"),
            data_json,
            style_ids_json: payload_or(serialize_style_ids(&result.styles.get_record()), "[]"),
            chunk_ids_json: payload_or(serialize_chunk_ids(result.chunks.record()), "[]"),
            chunk_scripts: result.chunks.get_script_tags(),
        };

        assemble(&parts)
    }

    /// Write a prepared response to a transport sink.
    ///
    /// Awaits the sink for every chunk. A transport failure ends the write
    /// early and is reported in the summary, never returned as an error.
    pub async fn write_to<S>(
        &self,
        ctx: &mut RequestContext,
        response: &PreparedResponse,
        sink: S,
    ) -> ResponseSummary
    where
        S: Sink<Vec<u8>> + Unpin,
        S::Error: Display,
    {
        let timing = std::mem::take(&mut ctx.timing);
        let mut writer = StreamWriter::new(sink, timing).with_chunk_size(self.config.stream.chunk_size);

        let written = async {
            writer.write_str(&response.body).await?;
            writer.finish().await
        }
        .await;

        let outcome = match written {
            Ok(()) => ResponseOutcome::Completed,
            Err(e) => {
                debug!(request_id = %ctx.request_id, error = %e, "Response aborted");
                ResponseOutcome::Aborted(e.to_string())
            }
        };

        let summary = ResponseSummary {
            request_id: ctx.request_id.clone(),
            status: response.status,
            bytes_written: writer.bytes_written(),
            writes: writer.writes(),
            outcome: outcome.clone(),
            degraded: response.degraded,
            timings: writer.timing().marks(),
        };
        ctx.timing = writer.into_timing();

        match outcome {
            ResponseOutcome::Completed => self.notify(ctx, LifecyclePhase::Completion),
            ResponseOutcome::Aborted(reason) => self.notify(ctx, LifecyclePhase::Aborted(reason)),
        }

        summary
    }

    /// Render a request and stream it to `sink`.
    pub async fn serve<S>(&self, ctx: &mut RequestContext, sink: S) -> (PreparedResponse, ResponseSummary)
    where
        S: Sink<Vec<u8>> + Unpin,
        S::Error: Display,
    {
        let response = self.render(ctx).await;
        let summary = self.write_to(ctx, &response, sink).await;
        (response, summary)
    }

    fn notify(&self, ctx: &RequestContext, phase: LifecyclePhase) {
        if let Some(observer) = &self.observer {
            observer.on_phase(phase, ctx.timing.elapsed());
        }
    }
}

fn payload_or<E: Display>(payload: Result<String, E>, fallback: &str) -> String {
    payload.unwrap_or_else(|e| {
        warn!(error = %e, "Payload encoding failed");
        fallback.to_string()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::channel::mpsc;
    use futures::StreamExt;
    use hydra_core::RouteParams;
    use hydra_data::loader_fn;
    use hydra_render::{component, el, Node, RenderError, RenderScope};
    use hydra_router::{QueryKey, RouteEntry, RouteTable};
    use hydra_snapshot::{DATA_SCRIPT_ID, FLAG_SCRIPT_ID};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    fn app(calls: Arc<AtomicUsize>) -> Application {
        let routes = RouteTable::new()
            .route(
                RouteEntry::new("/hello/:name", "Hello")
                    .with_query_key(QueryKey::new(["greeting", ":name"]))
                    .with_loader(loader_fn("greeting", move |p: RouteParams| {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(Greeting { text: format!("hi {}", p["name"]) })
                        }
                    })),
            )
            .route(RouteEntry::new("/broken", "Broken"))
            .route(RouteEntry::new("/private", "Private"));

        Application::new(routes)
            .component(
                "Hello",
                component(|cx: &mut RenderScope<'_>| {
                    let text = match cx.route_data::<Greeting>().ready() {
                        Some(g) => g.text,
                        None => "nothing".to_string(),
                    };
                    Ok(el("p").child(text).into())
                }),
            )
            .component(
                "Broken",
                component(|_cx: &mut RenderScope<'_>| -> Result<Node, RenderError> {
                    Err(RenderError::component("Broken", "always fails"))
                }),
            )
            .component(
                "Private",
                component(|cx: &mut RenderScope<'_>| Ok(cx.go_to("/login"))),
            )
    }

    fn pipeline(mode: RenderMode) -> (SsrPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = AppConfig::default();
        config.render.mode = mode;
        (SsrPipeline::new(Arc::new(app(calls.clone())), config), calls)
    }

    #[tokio::test]
    async fn test_render_matched_route() {
        let (pipeline, calls) = pipeline(RenderMode::Buffered);
        let mut ctx = RequestContext::get("/hello/ada");

        let response = pipeline.render(&mut ctx).await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains(r#"<div id="root"><p>hi ada</p></div>"#));
        assert!(response.body.contains(r#"{"v":1,"isSSR":true}"#));
        assert!(ctx.dehydrated.as_deref().unwrap().contains("hi ada"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ctx.timing.since_start("prefetch_done").is_some());
    }

    #[tokio::test]
    async fn test_streaming_and_buffered_match() {
        let (buffered, _) = pipeline(RenderMode::Buffered);
        let (streaming, _) = pipeline(RenderMode::Streaming);

        let a = buffered.render(&mut RequestContext::get("/hello/bo")).await;
        let b = streaming.render(&mut RequestContext::get("/hello/bo")).await;

        let root = |body: &str| {
            let start = body.find(r#"<div id="root">"#).unwrap();
            let end = body.find(FLAG_SCRIPT_ID).unwrap();
            body[start..end].to_string()
        };
        assert_eq!(root(&a.body), root(&b.body));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (pipeline, _) = pipeline(RenderMode::Buffered);
        let response = pipeline.render(&mut RequestContext::get("/missing")).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.contains("Not Found"));
    }

    #[tokio::test]
    async fn test_degraded_render_completes() {
        let (pipeline, _) = pipeline(RenderMode::Streaming);
        let (tx, rx) = mpsc::channel(4);
        let mut ctx = RequestContext::get("/broken");

        let ((response, summary), _) =
            futures::join!(pipeline.serve(&mut ctx, tx), rx.collect::<Vec<Vec<u8>>>());
        assert!(response.degraded);
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains(r#"<div id="root"></div>"#));
        assert!(response.body.contains(r#"{"v":1,"isSSR":false}"#));
        assert!(response.body.contains(DATA_SCRIPT_ID));
        assert!(summary.is_complete());
        assert!(summary.degraded);
    }

    #[tokio::test]
    async fn test_server_redirect() {
        let (pipeline, _) = pipeline(RenderMode::Buffered);
        let mut ctx = RequestContext::get("/private");

        let response = pipeline.render(&mut ctx).await;

        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.location(), Some("/login"));
        assert_eq!(ctx.redirect.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn test_request_id_header_adopted() {
        let (pipeline, _) = pipeline(RenderMode::Buffered);
        let mut ctx = RequestContext::get("/hello/x").with_header("X-Request-Id", "abc-123");

        let response = pipeline.render(&mut ctx).await;
        assert_eq!(response.headers.get("x-request-id").unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn test_serve_streams_whole_document() {
        let (pipeline, _) = pipeline(RenderMode::Streaming);
        let mut config = pipeline.config().clone();
        config.stream.chunk_size = 64;
        let pipeline = SsrPipeline::new(pipeline.app().clone(), config);

        let (tx, rx) = mpsc::channel(1);
        let mut ctx = RequestContext::get("/hello/cy");

        let ((response, summary), chunks) = futures::join!(
            pipeline.serve(&mut ctx, tx),
            rx.collect::<Vec<Vec<u8>>>()
        );

        assert_eq!(chunks.concat(), response.body.as_bytes());
        assert!(chunks.iter().all(|c| c.len() <= 64));
        assert_eq!(summary.writes, chunks.len());
        assert!(summary.timing("shell_sent").is_some());
        assert!(summary.timing("complete").is_some());
    }

    #[tokio::test]
    async fn test_client_disconnect_is_contained() {
        let (pipeline, _) = pipeline(RenderMode::Buffered);
        let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
        drop(rx);
        let mut ctx = RequestContext::get("/hello/dee");

        let (_, summary) = pipeline.serve(&mut ctx, tx).await;
        assert!(matches!(summary.outcome, ResponseOutcome::Aborted(_)));
        assert_eq!(summary.bytes_written, 0);
    }

    struct Recorder(Mutex<Vec<LifecyclePhase>>);

    impl LifecycleObserver for Recorder {
        fn on_phase(&self, phase: LifecyclePhase, _elapsed: Duration) {
            if let Ok(mut phases) = self.0.lock() {
                phases.push(phase);
            }
        }
    }

    #[tokio::test]
    async fn test_observer_sees_lifecycle() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let (pipeline, _) = pipeline(RenderMode::Buffered);
        let pipeline = pipeline.with_observer(recorder.clone());

        let (tx, rx) = mpsc::channel(8);
        let mut ctx = RequestContext::get("/hello/eve");
        let _ = futures::join!(pipeline.serve(&mut ctx, tx), rx.collect::<Vec<Vec<u8>>>());

        let phases = recorder.0.lock().unwrap().clone();
        assert_eq!(
            phases,
            vec![
                LifecyclePhase::Start,
                LifecyclePhase::Prefetched,
                LifecyclePhase::Rendered,
                LifecyclePhase::Completion,
            ]
        );
    }
}
