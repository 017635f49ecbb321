//! Server render followed by client boot against the reference portal.

use std::sync::Arc;

use agent_portal::{
    portal_app, portal_config, portal_pipeline, PortalStore, AGENT_DETAIL_CHUNK, JOB_DETAIL_CHUNK,
};
use futures::channel::mpsc;
use futures::StreamExt;
use hydra_sdk::prelude::*;

async fn server_render(path: &str) -> PreparedResponse {
    let pipeline = portal_pipeline(Arc::new(PortalStore::sample()), portal_config());
    pipeline.render(&mut RequestContext::get(path)).await
}

fn position(body: &str, needle: &str) -> usize {
    body.find(needle)
        .unwrap_or_else(|| panic!("{} not found in document", needle))
}

fn strip_script(html: &str, id: &str) -> String {
    let start = position(html, &format!(r#"<script id="{}""#, id));
    let end = start + html[start..].find("</script>").unwrap() + "</script>".len();
    format!("{}{}", &html[..start], &html[end..])
}

#[tokio::test]
async fn test_hydrate_makes_no_loader_calls() {
    let response = server_render("/agents/7").await;
    assert_eq!(response.status.as_u16(), 200);

    let client_store = Arc::new(PortalStore::sample());
    let mut dom = HtmlDocument::parse(response.body);
    let (_, outcome) = Bootstrap::new(Arc::new(portal_app(client_store.clone())))
        .start(&mut dom, "/agents/7")
        .await;

    assert_eq!(outcome.mode, BootMode::Hydrate);
    assert!(!outcome.mismatch);
    assert_eq!(outcome.loader_calls, 0);
    assert_eq!(outcome.inserted_styles, 0);
    assert!(outcome.extra_chunks.is_empty());
    assert_eq!(client_store.loads(), 0);
    assert_eq!(dom.mutations(), 0);
}

#[tokio::test]
async fn test_cold_start_renders_identical_markup() {
    let response = server_render("/jobs/101").await;
    let expected = HtmlDocument::parse(response.body.clone()).root_html("root");
    let mut dom = HtmlDocument::parse(strip_script(&response.body, FLAG_SCRIPT_ID));

    let client_store = Arc::new(PortalStore::sample());
    let (_, outcome) = Bootstrap::new(Arc::new(portal_app(client_store.clone())))
        .start(&mut dom, "/jobs/101")
        .await;

    assert_eq!(outcome.mode, BootMode::ColdStart);
    assert_eq!(outcome.reason, Some(ColdStartReason::FlagAbsent));
    assert_eq!(dom.root_html("root"), expected);
    // Layout and job loaders run again; the data payload was not trusted.
    assert_eq!(client_store.loads(), 2);
}

#[tokio::test]
async fn test_document_ordering() {
    let body = server_render("/jobs/101").await.body;

    let head_end = position(&body, "</head>");
    assert!(position(&body, r#"<link rel="modulepreload""#) < head_end);
    assert!(position(&body, "data-hydra-style") < head_end);

    let root = position(&body, r#"<div id="root">"#);
    let flag = position(&body, FLAG_SCRIPT_ID);
    let data = position(&body, DATA_SCRIPT_ID);
    let styles = position(&body, STYLE_SCRIPT_ID);
    let chunks = position(&body, CHUNK_SCRIPT_ID);
    let main_js = position(&body, r#"src="/static/main.js""#);

    assert!(head_end < root);
    assert!(root < flag && flag < data && data < styles && styles < chunks);
    assert!(chunks < main_js);
}

#[tokio::test]
async fn test_chunk_tags_cover_rendered_pages_only() {
    let body = server_render("/jobs/101").await.body;

    let shared = position(&body, r#"<script type="module" src="/static/ui-shared.js""#);
    let job = position(&body, r#"<script type="module" src="/static/job-detail.js""#);
    let main = position(&body, r#"<script type="module" src="/static/main.js""#);
    assert!(shared < job);
    assert!(job < main);
    assert!(body.contains(r#"href="/static/job-detail.css""#));
    assert!(!body.contains("agent-detail.js"));

    let dom = HtmlDocument::parse(body);
    let chunks = parse_chunk_ids(&dom.script_text(CHUNK_SCRIPT_ID).unwrap()).unwrap();
    assert_eq!(chunks.ids(), [JOB_DETAIL_CHUNK.to_string()]);
}

#[tokio::test]
async fn test_concurrent_requests_stay_isolated() {
    let pipeline = portal_pipeline(
        Arc::new(PortalStore::sample().with_latency(std::time::Duration::from_millis(5))),
        portal_config(),
    );
    let mut agent_ctx = RequestContext::get("/agents/7");
    let mut job_ctx = RequestContext::get("/jobs/101");

    let (agent, job) = futures::join!(pipeline.render(&mut agent_ctx), pipeline.render(&mut job_ctx));
    assert_eq!(agent.status.as_u16(), 200);
    assert_eq!(job.status.as_u16(), 200);

    let agent_dom = HtmlDocument::parse(agent.body.clone());
    let job_dom = HtmlDocument::parse(job.body.clone());

    let agent_chunks = parse_chunk_ids(&agent_dom.script_text(CHUNK_SCRIPT_ID).unwrap()).unwrap();
    let job_chunks = parse_chunk_ids(&job_dom.script_text(CHUNK_SCRIPT_ID).unwrap()).unwrap();
    assert_eq!(agent_chunks.ids(), [AGENT_DETAIL_CHUNK.to_string()]);
    assert_eq!(job_chunks.ids(), [JOB_DETAIL_CHUNK.to_string()]);
    assert!(!agent.body.contains("job-detail.js"));
    assert!(!job.body.contains("agent-detail.js"));

    // Logs only render on the job page, the agent badge only on the agent page.
    let logs = StyleRule::class("logs", "font-family:monospace;background:#111827;color:#f9fafb;padding:12px");
    let running = StyleRule::class("badge-running", "color:#065f46;background:#d1fae5");
    let agent_styles = parse_style_ids(&agent_dom.script_text(STYLE_SCRIPT_ID).unwrap()).unwrap();
    let job_styles = parse_style_ids(&job_dom.script_text(STYLE_SCRIPT_ID).unwrap()).unwrap();
    assert!(agent_styles.contains(running.id()) && !agent_styles.contains(logs.id()));
    assert!(job_styles.contains(logs.id()) && !job_styles.contains(running.id()));

    let agent_data = hydra_sdk::hydra_snapshot::deserialize(&agent_dom.script_text(DATA_SCRIPT_ID).unwrap()).unwrap();
    let job_data = hydra_sdk::hydra_snapshot::deserialize(&job_dom.script_text(DATA_SCRIPT_ID).unwrap()).unwrap();
    assert_eq!(agent_data.len(), 2);
    assert_eq!(job_data.len(), 2);
    assert!(agent_data.contains(&CacheKey::new(["agent", "7"])));
    assert!(!agent_data.contains(&CacheKey::new(["job", "101"])));
    assert!(job_data.contains(&CacheKey::new(["job", "101"])));
    assert!(!job_data.contains(&CacheKey::new(["agent", "7"])));
}

#[tokio::test]
async fn test_shared_loader_key_fetched_once() {
    let store = Arc::new(PortalStore::sample());
    let pipeline = portal_pipeline(store.clone(), portal_config());
    let mut ctx = RequestContext::get("/agents");

    let response = pipeline.render(&mut ctx).await;

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(store.loads(), 1);
    assert!(response.body.contains("Agents (2)"));
    assert_eq!(ctx.cache.len(), 1);
}

#[tokio::test]
async fn test_failed_page_ships_degraded_document() {
    let response = server_render("/agents/999").await;

    assert!(response.degraded);
    assert!(response.body.contains(r#"{"v":1,"isSSR":false}"#));
    assert!(response.body.contains("agent 999 not found"));

    let client_store = Arc::new(PortalStore::sample());
    let mut dom = HtmlDocument::parse(response.body);
    let (_, outcome) = Bootstrap::new(Arc::new(portal_app(client_store.clone())))
        .start(&mut dom, "/agents/999")
        .await;

    assert_eq!(outcome.mode, BootMode::ColdStart);
    assert_eq!(outcome.reason, Some(ColdStartReason::NotServerRendered));
    // Snapshotted entries, including the failure, are not fetched again.
    assert_eq!(client_store.loads(), 0);
}

#[tokio::test]
async fn test_error_boundary_keeps_page() {
    let response = server_render("/jobs/102").await;

    assert!(!response.degraded);
    assert!(response.body.contains("Summarize incidents"));
    assert!(response.body.contains("Logs unavailable"));
}

#[tokio::test]
async fn test_index_redirects() {
    let pipeline = portal_pipeline(Arc::new(PortalStore::sample()), portal_config());
    let mut ctx = RequestContext::get("/");

    let response = pipeline.render(&mut ctx).await;

    assert_eq!(response.status.as_u16(), 302);
    assert_eq!(response.location(), Some("/agents"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let response = server_render("/settings").await;

    assert_eq!(response.status.as_u16(), 404);
    assert!(response.body.contains("Page not found"));
}

#[tokio::test]
async fn test_client_navigation_loads_new_chunk() {
    let response = server_render("/agents/7").await;
    let client_store = Arc::new(PortalStore::sample());
    let mut dom = HtmlDocument::parse(response.body);
    let (mut runtime, _) = Bootstrap::new(Arc::new(portal_app(client_store.clone())))
        .start(&mut dom, "/agents/7")
        .await;

    let outcome = runtime.navigate(&mut dom, "/jobs/101").await;

    assert_eq!(outcome.new_chunks, vec![JOB_DETAIL_CHUNK.to_string()]);
    // Only the job itself; the agent list came from the snapshot.
    assert_eq!(outcome.loader_calls, 1);
    assert_eq!(client_store.loads(), 1);
    assert!(dom.root_html("root").unwrap().contains("Index quarterly reports"));

    let back = runtime.navigate(&mut dom, "/agents/7").await;
    assert_eq!(back.loader_calls, 0);
    assert!(back.new_chunks.is_empty());
}

#[tokio::test]
async fn test_slow_consumer_receives_whole_document() {
    let pipeline = portal_pipeline(
        Arc::new(PortalStore::sample()),
        portal_config().with_chunk_size(256),
    );
    let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
    let mut ctx = RequestContext::get("/agents/7");

    let consumer = async {
        let mut received = Vec::new();
        let mut rx = rx;
        while let Some(chunk) = rx.next().await {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            received.extend(chunk);
        }
        received
    };

    let ((response, summary), received) = futures::join!(pipeline.serve(&mut ctx, tx), consumer);

    assert!(summary.is_complete());
    assert!(summary.writes > 1);
    assert_eq!(summary.bytes_written, response.body.len());
    assert_eq!(received, response.body.into_bytes());
    assert!(summary.timing("shell_sent").is_some());
    assert!(summary.timing("complete").is_some());
}

#[tokio::test]
async fn test_disconnect_aborts_response() {
    let pipeline = portal_pipeline(
        Arc::new(PortalStore::sample()),
        portal_config().with_chunk_size(64),
    );
    let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
    drop(rx);

    let (_, summary) = pipeline.serve(&mut RequestContext::get("/agents"), tx).await;

    assert!(!summary.is_complete());
    assert!(matches!(summary.outcome, ResponseOutcome::Aborted(_)));
}
