//! Markup tree returned by components.

use crate::escape::{escape_attr, escape_text};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node in the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Node {
    /// Renders nothing.
    #[default]
    Empty,
    /// Escaped text.
    Text(String),
    /// Pre-rendered markup, inserted verbatim.
    Raw(String),
    /// An element.
    Element(Element),
    /// A sequence of nodes without a wrapper.
    Fragment(Vec<Node>),
}

impl Node {
    /// Create a text node.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create a raw markup node.
    pub fn raw(html: impl Into<String>) -> Self {
        Self::Raw(html.into())
    }

    /// Create a fragment.
    pub fn fragment(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self::Fragment(nodes.into_iter().collect())
    }

    /// Render to an HTML string.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Append HTML to `out`.
    pub fn write_html(&self, out: &mut String) {
        match self {
            Self::Empty => {}
            Self::Text(s) => out.push_str(&escape_text(s)),
            Self::Raw(html) => out.push_str(html),
            Self::Element(el) => el.write_html(out),
            Self::Fragment(nodes) => {
                for node in nodes {
                    node.write_html(out);
                }
            }
        }
    }

    /// Split into top-level pieces, rendered separately.
    pub fn into_segments(self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::Fragment(nodes) => nodes
                .into_iter()
                .map(|n| n.to_html())
                .filter(|s| !s.is_empty())
                .collect(),
            other => vec![other.to_html()],
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute. Setting the same name twice keeps the last value.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
        self
    }

    /// Append a class name.
    pub fn class(self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref();
        let merged = match self.attrs.iter().find(|(n, _)| n == "class") {
            Some((_, existing)) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.attr("class", merged)
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }

        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Shorthand for `Element::new`.
pub fn el(tag: impl Into<String>) -> Element {
    Element::new(tag)
}
