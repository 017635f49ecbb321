//! Per-render style extraction.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::escape::{escape_attr, escape_style};

/// Attribute marking an emitted `<style>` element with its rule id.
pub const STYLE_ID_ATTR: &str = "data-hydra-style";

/// Identifier of a style rule. Stable across processes: derived from the
/// rule's label and CSS only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleId(String);

impl StyleId {
    /// Create a style id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A style rule a component can instantiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    id: StyleId,
    css: String,
}

impl StyleRule {
    /// Class-scoped rule. `body` holds declarations; the generated class
    /// name doubles as the rule id.
    ///
    /// `StyleRule::class("card", "padding:1rem;")` produces
    /// `.hy-card-1a2b3c4d{padding:1rem;}`.
    pub fn class(label: &str, body: &str) -> Self {
        let id = StyleId(format!("hy-{}-{:08x}", label, fnv1a(body)));
        let css = format!(".{}{{{}}}", id, body);
        Self { id, css }
    }

    /// Rule with an explicit id and verbatim CSS (e.g. global resets).
    pub fn global(id: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            id: StyleId(id.into()),
            css: css.into(),
        }
    }

    /// Rule id. For class rules this is also the class name.
    pub fn id(&self) -> &StyleId {
        &self.id
    }

    /// Rule CSS.
    pub fn css(&self) -> &str {
        &self.css
    }
}

/// Ordered set of style ids inserted during one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleRecord(Vec<StyleId>);

impl StyleRecord {
    /// Create a record from ids, dropping repeats.
    pub fn from_ids(ids: impl IntoIterator<Item = StyleId>) -> Self {
        let mut seen = HashSet::new();
        Self(ids.into_iter().filter(|id| seen.insert(id.clone())).collect())
    }

    /// Ids in first-insertion order.
    pub fn ids(&self) -> &[StyleId] {
        &self.0
    }

    /// Number of ids.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether an id is recorded.
    pub fn contains(&self, id: &StyleId) -> bool {
        self.0.contains(id)
    }
}

/// Records every style rule inserted during one render pass.
///
/// One instance per render: a fresh extractor starts empty, so ids never
/// leak from one request into another.
#[derive(Debug, Default)]
pub struct StyleExtractor {
    order: Vec<StyleId>,
    css: HashMap<StyleId, String>,
    present: HashSet<StyleId>,
}

impl StyleExtractor {
    /// Create an empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor that treats `ids` as already present in the
    /// document (client side, after reading the style-id payload).
    pub fn with_present(ids: impl IntoIterator<Item = StyleId>) -> Self {
        Self {
            present: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Insert a rule. Returns `true` if this call emitted it; re-inserting a
    /// rule already seen in this pass (or already present) is a no-op.
    pub fn insert(&mut self, rule: &StyleRule) -> bool {
        if self.present.contains(&rule.id) || self.css.contains_key(&rule.id) {
            return false;
        }
        self.order.push(rule.id.clone());
        self.css.insert(rule.id.clone(), rule.css.clone());
        true
    }

    /// Ids inserted by this pass, in first-insertion order.
    pub fn get_record(&self) -> StyleRecord {
        StyleRecord(self.order.clone())
    }

    /// Whether an id was inserted or is already present.
    pub fn is_inserted(&self, id: &StyleId) -> bool {
        self.present.contains(id) || self.css.contains_key(id)
    }

    /// One `<style>` element per inserted rule, in insertion order.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for id in &self.order {
            let css = self.css.get(id).map(String::as_str).unwrap_or_default();
            out.push_str(&format!(
                r#"<style {}="{}">{}</style>"#,
                STYLE_ID_ATTR,
                escape_attr(id.as_str()),
                escape_style(css)
            ));
        }
        out
    }

    /// Forget everything inserted by this pass.
    pub fn reset(&mut self) {
        self.order.clear();
        self.css.clear();
    }

    /// Number of rules inserted so far, for a later `rollback`.
    pub fn checkpoint(&self) -> usize {
        self.order.len()
    }

    /// Drop every rule inserted after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        if checkpoint >= self.order.len() {
            return;
        }
        for id in self.order.drain(checkpoint..) {
            self.css.remove(&id);
        }
    }
}

// FNV-1a, 32-bit: the id must be identical on server and client builds.
fn fnv1a(s: &str) -> u32 {
    s.bytes().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}
