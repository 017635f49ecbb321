//! Server-render a path of the reference application.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use agent_portal::{portal_app, PortalStore};
use anyhow::{Context as _, Result};
use futures::channel::mpsc;
use futures::StreamExt;
use hydra_sdk::hydra_core::{RenderMode, RequestContext};
use hydra_sdk::hydra_server::{ResponseOutcome, SsrPipeline};
use serde::Serialize;
use tracing::debug;

use super::RenderArgs;
use crate::context::Context;
use crate::output::{format_bytes, format_duration, status_badge};

/// Summary printed for `--json`.
#[derive(Debug, Serialize)]
struct RenderReport {
    request_id: String,
    path: String,
    status: u16,
    location: Option<String>,
    degraded: bool,
    bytes: usize,
    writes: usize,
    aborted: Option<String>,
    cache_entries: usize,
    /// Milliseconds from request start.
    timings: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
}

/// Run the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if args.buffered {
        config.render.mode = RenderMode::Buffered;
    }
    if let Some(size) = args.chunk_size {
        config = config.with_chunk_size(size);
    }

    let mut store = PortalStore::sample();
    if let Some(ms) = args.latency_ms {
        store = store.with_latency(Duration::from_millis(ms));
    }

    let pipeline = SsrPipeline::from_config(portal_app(Arc::new(store)), config)
        .context("Failed to build pipeline")?;
    debug!(path = %args.path, mode = ?pipeline.config().render.mode, "Rendering");

    let mut request = RequestContext::get(&args.path);
    if let Some(id) = &args.request_id {
        request = request.with_header("x-request-id", id.as_str());
    }

    let (tx, rx) = mpsc::channel::<Vec<u8>>(args.buffer.max(1));
    let ((response, summary), received) =
        futures::join!(pipeline.serve(&mut request, tx), rx.concat());
    let document = String::from_utf8(received).context("Document is not UTF-8")?;

    if let Some(out) = &args.out {
        let path = ctx.resolve_path(out);
        std::fs::write(&path, &document)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        ctx.output.success(&format!("Wrote {}", path.display()));
    }

    let timings: BTreeMap<String, f64> = summary
        .timings
        .iter()
        .map(|(name, d)| (name.clone(), d.as_secs_f64() * 1000.0))
        .collect();
    let aborted = match &summary.outcome {
        ResponseOutcome::Completed => None,
        ResponseOutcome::Aborted(reason) => Some(reason.clone()),
    };

    if ctx.output.is_json() {
        ctx.output.json(&RenderReport {
            request_id: summary.request_id.to_string(),
            path: args.path.clone(),
            status: summary.status.as_u16(),
            location: response.location().map(str::to_string),
            degraded: summary.degraded,
            bytes: summary.bytes_written,
            writes: summary.writes,
            aborted,
            cache_entries: request.cache.len(),
            timings,
            document: args.print.then_some(document),
        });
        return Ok(());
    }

    ctx.output.header(&format!("Rendered {}", args.path));
    ctx.output.kv("Status", &status_badge(summary.status.as_u16()));
    ctx.output.kv("Request ID", &summary.request_id.to_string());
    if let Some(location) = response.location() {
        ctx.output.kv("Location", location);
    }
    ctx.output.kv(
        "Body",
        &format!("{} in {} writes", format_bytes(summary.bytes_written as u64), summary.writes),
    );
    ctx.output.kv("Cache entries", &request.cache.len().to_string());
    for (key, entry) in request.cache.iter() {
        ctx.output.list_item(&format!("{} ({:?})", key, entry.status()));
    }

    ctx.output.header("Timings");
    for (name, d) in &summary.timings {
        ctx.output.table_row(&[name.as_str(), format_duration(*d).as_str()], &[16, 10]);
    }

    if summary.degraded {
        ctx.output.warn("Render failed; document tells the client to cold-start");
    }
    if let Some(reason) = aborted {
        ctx.output.warn(&format!("Response aborted: {}", reason));
    }

    if args.print {
        println!("\n{}", document);
    }
    if let Some(hint) = document_hint(args.print, args.out.as_deref()) {
        ctx.output.info(hint);
    }
    Ok(())
}

/// Hint shown when the document went nowhere.
fn document_hint(print: bool, out: Option<&str>) -> Option<&'static str> {
    (!print && out.is_none()).then_some("Document not shown; pass --print or --out <file>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_hint_only_when_document_unseen() {
        assert!(document_hint(false, None).is_some());
        assert!(document_hint(true, None).is_none());
        assert!(document_hint(false, Some("page.html")).is_none());
    }
}
