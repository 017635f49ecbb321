//! Validate a chunk manifest.

use anyhow::{bail, Context as _, Result};
use hydra_sdk::hydra_render::ChunkManifest;
use serde::Serialize;

use super::ManifestArgs;
use crate::context::Context;

#[derive(Debug, Serialize)]
struct ManifestReport {
    entrypoints: Vec<String>,
    chunks: usize,
    problems: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<ResolvedReport>,
}

#[derive(Debug, Serialize)]
struct ResolvedReport {
    scripts: Vec<String>,
    styles: Vec<String>,
}

/// Run the manifest command.
pub async fn run(args: ManifestArgs, ctx: &Context) -> Result<()> {
    let path = match (&args.file, &ctx.config.assets.manifest) {
        (Some(file), _) => ctx.resolve_path(file),
        (None, Some(configured)) => ctx.resolve_path(configured),
        (None, None) => bail!("No manifest given and none configured in [assets]"),
    };
    let mut manifest = ChunkManifest::load(&path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;
    if manifest.public_path.is_empty() {
        manifest.public_path = ctx.config.assets.public_path.clone();
    }

    let problems: Vec<String> = manifest.validate().iter().map(|p| p.to_string()).collect();
    let resolved = if args.resolve.is_empty() {
        None
    } else {
        let assets = manifest.resolve_files(args.resolve.iter().map(String::as_str));
        Some(ResolvedReport {
            scripts: assets.scripts,
            styles: assets.styles,
        })
    };

    let report = ManifestReport {
        entrypoints: manifest.entrypoints.clone(),
        chunks: manifest.chunks.len(),
        problems,
        resolved,
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        ctx.output.header(&format!("Manifest {}", path.display()));
        ctx.output.kv("Public path", &manifest.public_path);
        ctx.output.kv("Entrypoints", &report.entrypoints.join(", "));
        for (id, assets) in &manifest.chunks {
            ctx.output.table_row(
                &[
                    id.as_str(),
                    format!("{} scripts", assets.scripts.len()).as_str(),
                    format!("{} styles", assets.styles.len()).as_str(),
                    assets.imports.join(", ").as_str(),
                ],
                &[20, 10, 10, 0],
            );
        }
        if let Some(resolved) = &report.resolved {
            ctx.output.header("Resolved files");
            for file in resolved.scripts.iter().chain(&resolved.styles) {
                ctx.output.list_item(file);
            }
        }
        for problem in &report.problems {
            ctx.output.warn(problem);
        }
    }

    if !report.problems.is_empty() {
        bail!("{} problem(s) in manifest", report.problems.len());
    }
    ctx.output.success("Manifest is consistent");
    Ok(())
}
