//! Inspect the payloads of a rendered document.

use std::sync::Arc;

use agent_portal::{portal_app, PortalStore};
use anyhow::{Context as _, Result};
use hydra_sdk::hydra_client::{BootMode, BootPayloads, Bootstrap, Dom, HtmlDocument};
use serde::Serialize;

use super::InspectArgs;
use crate::context::Context;
use crate::output::mode_badge;

#[derive(Debug, Serialize)]
struct InspectReport {
    flag: Option<FlagReport>,
    data_entries: Option<usize>,
    data_error: Option<String>,
    styles: Vec<String>,
    chunks: Vec<String>,
    root_present: bool,
    decision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    boot: Option<BootReport>,
}

#[derive(Debug, Serialize)]
struct FlagReport {
    v: u32,
    is_ssr: bool,
}

#[derive(Debug, Serialize)]
struct BootReport {
    location: String,
    mode: String,
    mismatch: bool,
    loader_calls: usize,
    inserted_styles: usize,
    extra_chunks: Vec<String>,
}

fn mode_name(mode: BootMode) -> &'static str {
    match mode {
        BootMode::Hydrate => "hydrate",
        BootMode::ColdStart => "cold-start",
    }
}

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.file);
    let html = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut dom = HtmlDocument::parse(html);
    let root_id = ctx.config.document.root_id.clone();

    let payloads = BootPayloads::read(&dom);
    let decision = match payloads.decide() {
        Ok(()) if dom.root_html(&root_id).is_some() => mode_name(BootMode::Hydrate).to_string(),
        Ok(()) => format!("cold-start: root element '{}' not found", root_id),
        Err(reason) => format!("cold-start: {}", reason),
    };

    let mut report = InspectReport {
        flag: payloads.flag.map(|f| FlagReport {
            v: f.v,
            is_ssr: f.is_ssr,
        }),
        data_entries: payloads.data.as_ref().ok().map(|cache| cache.len()),
        data_error: payloads.data.as_ref().err().cloned(),
        styles: payloads.styles.ids().iter().map(|id| id.to_string()).collect(),
        chunks: payloads.chunks.ids().to_vec(),
        root_present: dom.root_html(&root_id).is_some(),
        decision,
        boot: None,
    };

    if let Some(location) = &args.boot {
        let app = Arc::new(portal_app(Arc::new(PortalStore::sample())));
        let (_, outcome) = Bootstrap::new(app)
            .with_root_id(root_id.as_str())
            .start(&mut dom, location)
            .await;
        report.boot = Some(BootReport {
            location: location.clone(),
            mode: mode_name(outcome.mode).to_string(),
            mismatch: outcome.mismatch,
            loader_calls: outcome.loader_calls,
            inserted_styles: outcome.inserted_styles,
            extra_chunks: outcome.extra_chunks,
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header(&format!("Payloads in {}", path.display()));
    match &report.flag {
        Some(flag) => ctx
            .output
            .kv("Flag", &format!("v{} isSSR={}", flag.v, flag.is_ssr)),
        None => ctx.output.kv("Flag", "absent"),
    }
    match (&report.data_entries, &report.data_error) {
        (Some(n), _) => ctx.output.kv("Data entries", &n.to_string()),
        (None, Some(e)) => ctx.output.kv("Data", e),
        (None, None) => {}
    }
    ctx.output.kv("Style ids", &report.styles.len().to_string());
    ctx.output.kv("Chunks", &report.chunks.join(", "));
    ctx.output.kv("Root present", &report.root_present.to_string());
    ctx.output.kv("Decision", &report.decision);

    if let Some(boot) = &report.boot {
        ctx.output.header(&format!("Boot at {}", boot.location));
        ctx.output.kv("Mode", &mode_badge(&boot.mode));
        ctx.output.kv("Loader calls", &boot.loader_calls.to_string());
        ctx.output.kv("Inserted styles", &boot.inserted_styles.to_string());
        if boot.mismatch {
            ctx.output.warn("Client markup differed from the server's; root patched");
        }
        for chunk in &boot.extra_chunks {
            ctx.output.list_item(&format!("extra chunk {}", chunk));
        }
    }
    Ok(())
}
