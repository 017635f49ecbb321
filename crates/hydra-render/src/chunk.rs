//! Code-split chunk manifest and per-render chunk extraction.
//!
//! The manifest is produced by the external bundler and loaded once at
//! process start. A `ChunkExtractor` is created per render and records the
//! chunks the rendered tree actually touched; only those (plus the
//! entrypoints and their shared imports) end up as tags in the document.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::RenderError;
use crate::escape::escape_attr;

/// Error loading or validating a chunk manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("chunk '{chunk}' imports unknown chunk '{import}'")]
    UnknownImport { chunk: String, import: String },

    #[error("unknown entrypoint chunk '{0}'")]
    UnknownEntrypoint(String),

    #[error("import cycle through chunk '{0}'")]
    Cycle(String),
}

/// Files belonging to one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAssets {
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    /// Shared chunks this chunk depends on.
    #[serde(default)]
    pub imports: Vec<String>,
}

/// Build-time chunk manifest. Read-only for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    #[serde(default)]
    pub public_path: String,
    /// Chunks tagged on every page, in load order.
    #[serde(default)]
    pub entrypoints: Vec<String>,
    #[serde(default)]
    pub chunks: BTreeMap<String, ChunkAssets>,
}

impl ChunkManifest {
    /// Create an empty manifest with a public path.
    pub fn new(public_path: impl Into<String>) -> Self {
        Self {
            public_path: public_path.into(),
            ..Self::default()
        }
    }

    /// Add a chunk.
    pub fn with_chunk(mut self, id: impl Into<String>, assets: ChunkAssets) -> Self {
        self.chunks.insert(id.into(), assets);
        self
    }

    /// Add an entrypoint.
    pub fn with_entrypoint(mut self, id: impl Into<String>) -> Self {
        self.entrypoints.push(id.into());
        self
    }

    /// Parse a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Get a chunk's assets.
    pub fn get(&self, id: &str) -> Option<&ChunkAssets> {
        self.chunks.get(id)
    }

    /// Whether a chunk exists.
    pub fn contains(&self, id: &str) -> bool {
        self.chunks.contains_key(id)
    }

    /// Check references and import cycles. Returns every problem found.
    pub fn validate(&self) -> Vec<ManifestError> {
        let mut problems = Vec::new();

        for id in &self.entrypoints {
            if !self.contains(id) {
                problems.push(ManifestError::UnknownEntrypoint(id.clone()));
            }
        }

        for (id, assets) in &self.chunks {
            for import in &assets.imports {
                if !self.contains(import) {
                    problems.push(ManifestError::UnknownImport {
                        chunk: id.clone(),
                        import: import.clone(),
                    });
                }
            }
        }

        let mut done = HashSet::new();
        for id in self.chunks.keys() {
            let mut path = Vec::new();
            if let Some(cycle) = self.find_cycle(id, &mut path, &mut done) {
                problems.push(ManifestError::Cycle(cycle));
            }
        }

        problems
    }

    fn find_cycle<'a>(
        &'a self,
        id: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<String> {
        if path.contains(&id) {
            return Some(id.to_string());
        }
        if done.contains(id) {
            return None;
        }
        path.push(id);
        if let Some(assets) = self.chunks.get(id) {
            for import in &assets.imports {
                if let Some(cycle) = self.find_cycle(import, path, done) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        done.insert(id);
        None
    }

    /// Resolve chunks to file URLs, imports first, each file once.
    ///
    /// Unknown ids are skipped; callers check them when recording.
    pub fn resolve_files<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> ResolvedAssets {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for id in ids {
            self.visit(id, &mut visited, &mut order);
        }

        let mut resolved = ResolvedAssets::default();
        let mut seen = HashSet::new();
        for assets in order {
            for script in &assets.scripts {
                if seen.insert(script.as_str()) {
                    resolved.scripts.push(self.url(script));
                }
            }
            for style in &assets.styles {
                if seen.insert(style.as_str()) {
                    resolved.styles.push(self.url(style));
                }
            }
        }
        resolved
    }

    fn visit<'a>(&'a self, id: &'a str, visited: &mut HashSet<&'a str>, order: &mut Vec<&'a ChunkAssets>) {
        if !visited.insert(id) {
            return;
        }
        let Some(assets) = self.chunks.get(id) else {
            return;
        };
        for import in &assets.imports {
            self.visit(import, visited, order);
        }
        order.push(assets);
    }

    fn url(&self, file: &str) -> String {
        if file.starts_with('/') || file.contains("://") {
            return file.to_string();
        }
        format!("{}{}", self.public_path, file)
    }
}

/// File URLs for a set of chunks, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

/// Ordered set of chunk ids reachably rendered during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkRecord(Vec<String>);

impl ChunkRecord {
    /// Create a record from ids, dropping repeats.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = Self::default();
        for id in ids {
            record.push(id.into());
        }
        record
    }

    fn push(&mut self, id: String) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Ids in first-use order.
    pub fn ids(&self) -> &[String] {
        &self.0
    }

    /// Whether a chunk is recorded.
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|c| c == id)
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Records chunks used by one render and produces their tags.
#[derive(Debug, Clone)]
pub struct ChunkExtractor {
    manifest: Arc<ChunkManifest>,
    record: ChunkRecord,
}

impl ChunkExtractor {
    /// Create an extractor over the process-wide manifest.
    pub fn new(manifest: Arc<ChunkManifest>) -> Self {
        Self {
            manifest,
            record: ChunkRecord::default(),
        }
    }

    /// Record a chunk. Returns `true` the first time it is seen.
    pub fn add_chunk(&mut self, id: &str) -> Result<bool, RenderError> {
        if !self.manifest.contains(id) {
            return Err(RenderError::UnknownChunk(id.to_string()));
        }
        Ok(self.record.push(id.to_string()))
    }

    /// Chunks recorded so far.
    pub fn record(&self) -> &ChunkRecord {
        &self.record
    }

    /// Number of chunks recorded so far, for a later `rollback`.
    pub fn checkpoint(&self) -> usize {
        self.record.len()
    }

    /// Drop every chunk recorded after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        self.record.truncate(checkpoint);
    }

    /// The manifest this extractor resolves against.
    pub fn manifest(&self) -> &Arc<ChunkManifest> {
        &self.manifest
    }

    /// Recorded chunks followed by the entrypoints, so the entry loads last.
    fn tagged_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.record.ids().iter().map(String::as_str).collect();
        for entry in &self.manifest.entrypoints {
            if !ids.contains(&entry.as_str()) {
                ids.push(entry);
            }
        }
        ids
    }

    fn assets(&self) -> ResolvedAssets {
        self.manifest.resolve_files(self.tagged_ids())
    }

    /// `<link rel="modulepreload">` tags for every script to load.
    pub fn get_link_tags(&self) -> String {
        self.assets()
            .scripts
            .iter()
            .map(|src| format!(r#"<link rel="modulepreload" href="{}">"#, escape_attr(src)))
            .collect()
    }

    /// Stylesheet links for chunk-level CSS.
    pub fn get_style_tags(&self) -> String {
        self.assets()
            .styles
            .iter()
            .map(|href| format!(r#"<link rel="stylesheet" href="{}">"#, escape_attr(href)))
            .collect()
    }

    /// Body script tags, dependencies first, entrypoints last.
    pub fn get_script_tags(&self) -> String {
        self.assets()
            .scripts
            .iter()
            .map(|src| format!(r#"<script type="module" src="{}"></script>"#, escape_attr(src)))
            .collect()
    }

    /// Forget recorded chunks.
    pub fn reset(&mut self) {
        self.record = ChunkRecord::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(scripts: &[&str], styles: &[&str], imports: &[&str]) -> ChunkAssets {
        ChunkAssets {
            scripts: scripts.iter().map(|s| s.to_string()).collect(),
            styles: styles.iter().map(|s| s.to_string()).collect(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn manifest() -> Arc<ChunkManifest> {
        Arc::new(
            ChunkManifest::new("/static/")
                .with_entrypoint("main")
                .with_chunk("main", assets(&["main.js"], &["main.css"], &["vendor"]))
                .with_chunk("vendor", assets(&["vendor.js"], &[], &[]))
                .with_chunk("x", assets(&["x.js"], &["x.css"], &["vendor"]))
                .with_chunk("y", assets(&["y.js"], &[], &[]))
                .with_chunk("z", assets(&["z.js"], &["z.css"], &[])),
        )
    }

    #[test]
    fn test_record_holds_exactly_used_chunks() {
        let mut chunks = ChunkExtractor::new(manifest());
        assert!(chunks.add_chunk("x").unwrap());
        assert!(chunks.add_chunk("y").unwrap());
        assert!(!chunks.add_chunk("x").unwrap());

        assert_eq!(chunks.record().ids(), &["x".to_string(), "y".to_string()]);
        let scripts = chunks.get_script_tags();
        assert!(scripts.contains("/static/x.js"));
        assert!(scripts.contains("/static/y.js"));
        assert!(!scripts.contains("z.js"));
        assert!(!chunks.get_style_tags().contains("z.css"));
    }

    #[test]
    fn test_rollback_forgets_later_chunks() {
        let mut chunks = ChunkExtractor::new(manifest());
        chunks.add_chunk("y").unwrap();

        let checkpoint = chunks.checkpoint();
        chunks.add_chunk("z").unwrap();
        chunks.rollback(checkpoint);

        assert_eq!(chunks.record().ids(), &["y".to_string()]);
        assert!(!chunks.get_script_tags().contains("z.js"));
        assert!(chunks.add_chunk("z").unwrap());
    }

    #[test]
    fn test_unknown_chunk_is_error() {
        let mut chunks = ChunkExtractor::new(manifest());
        let err = chunks.add_chunk("missing").unwrap_err();
        assert!(matches!(err, RenderError::UnknownChunk(id) if id == "missing"));
        assert!(chunks.record().is_empty());
    }

    #[test]
    fn test_imports_first_and_entry_last() {
        let mut chunks = ChunkExtractor::new(manifest());
        chunks.add_chunk("x").unwrap();

        let scripts = chunks.get_script_tags();
        let vendor = scripts.find("vendor.js").unwrap();
        let x = scripts.find("x.js").unwrap();
        let main = scripts.find("main.js").unwrap();
        assert!(vendor < x && x < main);
        assert_eq!(scripts.matches("vendor.js").count(), 1);
    }

    #[test]
    fn test_entrypoints_tagged_without_chunks() {
        let chunks = ChunkExtractor::new(manifest());
        assert!(chunks.record().is_empty());
        assert!(chunks.get_script_tags().contains("main.js"));
        assert!(chunks.get_link_tags().starts_with(r#"<link rel="modulepreload""#));
        assert!(chunks.get_style_tags().contains("/static/main.css"));
    }

    #[test]
    fn test_manifest_from_json() {
        let json = r#"{
            "publicPath": "/assets/",
            "entrypoints": ["main"],
            "chunks": {
                "main": { "scripts": ["main.js"] },
                "detail": { "scripts": ["detail.js"], "styles": ["detail.css"], "imports": ["main"] }
            }
        }"#;
        let manifest = ChunkManifest::from_json(json).unwrap();
        assert_eq!(manifest.public_path, "/assets/");
        assert_eq!(manifest.get("detail").unwrap().imports, vec!["main".to_string()]);
        assert!(manifest.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let manifest = ChunkManifest::new("/")
            .with_entrypoint("ghost")
            .with_chunk("a", assets(&["a.js"], &[], &["b"]))
            .with_chunk("b", assets(&["b.js"], &[], &["a"]))
            .with_chunk("c", assets(&["c.js"], &[], &["nope"]));

        let problems = manifest.validate();
        assert!(problems.iter().any(|p| matches!(p, ManifestError::UnknownEntrypoint(id) if id == "ghost")));
        assert!(problems.iter().any(|p| matches!(p, ManifestError::UnknownImport { import, .. } if import == "nope")));
        assert!(problems.iter().any(|p| matches!(p, ManifestError::Cycle(_))));
    }

    #[test]
    fn test_absolute_urls_untouched() {
        let manifest = ChunkManifest::new("/static/")
            .with_chunk("cdn", assets(&["https://cdn.example.com/lib.js"], &["/abs.css"], &[]));
        let files = manifest.resolve_files(["cdn"]);
        assert_eq!(files.scripts, vec!["https://cdn.example.com/lib.js".to_string()]);
        assert_eq!(files.styles, vec!["/abs.css".to_string()]);
    }
}
