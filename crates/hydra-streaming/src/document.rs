//! Document assembly with a fixed tag order.
//!
//! ```text
//! <head>  [title, meta, page tags] [chunk preload links] [style tags]
//! <body>  [root element with markup]
//!         [flag payload] [data payload] [style-id payload] [chunk-id payload]
//!         [chunk scripts]
//! ```
//!
//! The client reads the inline payloads by id before any bundle script
//! runs, so every payload precedes every chunk script.

use hydra_core::DocumentConfig;
use hydra_render::{escape_attr, escape_text};
use hydra_snapshot::{
    payload_script, CHUNK_SCRIPT_ID, DATA_SCRIPT_ID, FLAG_SCRIPT_ID, STYLE_SCRIPT_ID,
};

/// Per-page head content.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Meta tags.
    pub meta: Vec<(String, String)>,
    /// Extra head tags, inserted verbatim.
    pub tags: Vec<String>,
}

impl HeadContent {
    /// Create head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Head content from document configuration.
    pub fn from_config(config: &DocumentConfig) -> Self {
        let mut head = Self::new(config.title.clone());
        head.meta = config.meta.clone();
        head
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a raw head tag.
    pub fn with_tag(mut self, html: impl Into<String>) -> Self {
        self.tags.push(html.into());
        self
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = String::from(r#"<meta charset="utf-8">"#);

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>", escape_text(title)));
        }

        for (name, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                escape_attr(name),
                escape_attr(content)
            ));
        }

        for tag in &self.tags {
            html.push_str(tag);
        }

        html
    }
}

/// Everything that goes into one document.
///
/// Payload fields hold script-safe JSON.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub lang: String,
    pub head: HeadContent,
    /// Chunk preload links.
    pub chunk_links: String,
    /// Extracted `<style>` tags followed by chunk stylesheet links.
    pub style_tags: String,
    pub root_id: String,
    /// Rendered root markup.
    pub markup: String,
    pub flag_json: String,
    pub data_json: String,
    pub style_ids_json: String,
    pub chunk_ids_json: String,
    /// Chunk script tags, entrypoints last.
    pub chunk_scripts: String,
}

/// Compose the complete document.
pub fn assemble(parts: &DocumentParts) -> String {
    let mut html = String::with_capacity(
        parts.markup.len() + parts.data_json.len() + parts.style_tags.len() + 512,
    );

    html.push_str("<!DOCTYPE html>");
    html.push_str(&format!(r#"<html lang="{}">"#, escape_attr(&parts.lang)));

    html.push_str("<head>");
    html.push_str(&parts.head.render());
    html.push_str(&parts.chunk_links);
    html.push_str(&parts.style_tags);
    html.push_str("</head>");

    html.push_str("<body>");
    html.push_str(&format!(r#"<div id="{}">"#, escape_attr(&parts.root_id)));
    html.push_str(&parts.markup);
    html.push_str("</div>");
    html.push_str(&payload_script(FLAG_SCRIPT_ID, &parts.flag_json));
    html.push_str(&payload_script(DATA_SCRIPT_ID, &parts.data_json));
    html.push_str(&payload_script(STYLE_SCRIPT_ID, &parts.style_ids_json));
    html.push_str(&payload_script(CHUNK_SCRIPT_ID, &parts.chunk_ids_json));
    html.push_str(&parts.chunk_scripts);
    html.push_str("</body></html>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> DocumentParts {
        DocumentParts {
            lang: "en".into(),
            head: HeadContent::new("Agents & Jobs").with_meta("description", "portal"),
            chunk_links: r#"<link rel="modulepreload" href="/static/main.js">"#.into(),
            style_tags: r#"<style data-hydra-style="a">.a{}</style><link rel="stylesheet" href="/static/main.css">"#.into(),
            root_id: "root".into(),
            markup: "<main>hi</main>".into(),
            flag_json: r#"{"v":1,"isSSR":true}"#.into(),
            data_json: r#"{"queries":[]}"#.into(),
            style_ids_json: r#"["a"]"#.into(),
            chunk_ids_json: "[]".into(),
            chunk_scripts: r#"<script type="module" src="/static/main.js"></script>"#.into(),
        }
    }

    fn position(html: &str, needle: &str) -> usize {
        html.find(needle).unwrap_or_else(|| panic!("missing {needle}"))
    }

    #[test]
    fn test_tag_order() {
        let html = assemble(&parts());

        let order = [
            "<title>",
            r#"rel="modulepreload""#,
            "<style ",
            r#"rel="stylesheet""#,
            "</head>",
            r#"<div id="root"><main>hi</main></div>"#,
            FLAG_SCRIPT_ID,
            DATA_SCRIPT_ID,
            STYLE_SCRIPT_ID,
            CHUNK_SCRIPT_ID,
            r#"<script type="module""#,
        ];
        for pair in order.windows(2) {
            assert!(
                position(&html, pair[0]) < position(&html, pair[1]),
                "{} should precede {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_data_script_precedes_every_body_script() {
        let html = assemble(&parts());
        let data = position(&html, DATA_SCRIPT_ID);
        let first_module = position(&html, r#"<script type="module""#);
        assert!(data < first_module);
    }

    #[test]
    fn test_head_escapes_title() {
        let html = assemble(&parts());
        assert!(html.contains("<title>Agents &amp; Jobs</title>"));
        assert!(html.starts_with(r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8">"#));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_empty_markup_still_valid_shell() {
        let mut parts = parts();
        parts.markup.clear();
        let html = assemble(&parts);
        assert!(html.contains(r#"<div id="root"></div>"#));
        assert!(html.contains(FLAG_SCRIPT_ID));
    }
}
