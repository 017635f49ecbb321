//! The document the client boots against.

/// What the bootstrap needs from the host document.
///
/// `HtmlDocument` implements it over a markup string; a browser binding
/// implements it over the live DOM.
pub trait Dom {
    /// Text content of the `<script>` element with this id.
    fn script_text(&self, id: &str) -> Option<String>;

    /// Inner HTML of the root mount element.
    fn root_html(&self, root_id: &str) -> Option<String>;

    /// Replace the root's content. Returns `false` if the root is missing.
    fn set_root_html(&mut self, root_id: &str, html: &str) -> bool;

    /// Append markup to `<head>`.
    fn append_head(&mut self, html: &str);
}

/// A document held as markup.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    html: String,
    mutations: usize,
}

impl HtmlDocument {
    /// Wrap a document.
    pub fn parse(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            mutations: 0,
        }
    }

    /// Current markup.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Number of changes made to the document since it was parsed.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Byte range of the root's inner HTML.
    fn root_range(&self, root_id: &str) -> Option<(usize, usize)> {
        let open = format!(r#"<div id="{}">"#, root_id);
        let start = self.html.find(&open)? + open.len();

        let mut depth = 1usize;
        let mut pos = start;
        while depth > 0 {
            let rest = &self.html[pos..];
            let next_open = find_div_open(rest);
            let next_close = rest.find("</div>")?;
            match next_open {
                Some(o) if o < next_close => {
                    depth += 1;
                    pos += o + 4;
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((start, pos + next_close));
                    }
                    pos += next_close + 6;
                }
            }
        }
        None
    }
}

/// Position of the next `<div` opening tag (not `<divider` or similar).
fn find_div_open(s: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(i) = s[offset..].find("<div") {
        let at = offset + i;
        match s.as_bytes().get(at + 4) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'/') => return Some(at),
            _ => offset = at + 4,
        }
    }
    None
}

impl Dom for HtmlDocument {
    fn script_text(&self, id: &str) -> Option<String> {
        let attr = format!(r#"id="{}""#, id);
        let mut offset = 0;

        while let Some(i) = self.html[offset..].find("<script") {
            let tag_start = offset + i;
            let tag_end = tag_start + self.html[tag_start..].find('>')?;
            let tag = &self.html[tag_start..tag_end];

            // Whole attribute only, so `data-id="..."` does not match.
            if tag.split_ascii_whitespace().any(|part| part == attr) {
                let body_start = tag_end + 1;
                let body_end = body_start + self.html[body_start..].find("</script>")?;
                return Some(self.html[body_start..body_end].to_string());
            }
            offset = tag_end;
        }
        None
    }

    fn root_html(&self, root_id: &str) -> Option<String> {
        let (start, end) = self.root_range(root_id)?;
        Some(self.html[start..end].to_string())
    }

    fn set_root_html(&mut self, root_id: &str, html: &str) -> bool {
        match self.root_range(root_id) {
            Some((start, end)) => {
                self.html.replace_range(start..end, html);
                self.mutations += 1;
                true
            }
            None => false,
        }
    }

    fn append_head(&mut self, html: &str) {
        if html.is_empty() {
            return;
        }
        match self.html.find("</head>") {
            Some(at) => self.html.insert_str(at, html),
            None => self.html.insert_str(0, html),
        }
        self.mutations += 1;
    }
}
