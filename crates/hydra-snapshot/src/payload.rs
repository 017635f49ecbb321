//! Inline payload identifiers, the SSR flag and companion payloads.

use hydra_render::{escape_attr, ChunkRecord, StyleRecord};
use serde::{Deserialize, Serialize};

use crate::escape::escape_script_json;
use crate::SnapshotError;

/// Script id of the dehydrated data cache.
pub const DATA_SCRIPT_ID: &str = "__HYDRA_DATA__";

/// Script id of the SSR flag.
pub const FLAG_SCRIPT_ID: &str = "__HYDRA_STATE__";

/// Script id of the inserted style ids.
pub const STYLE_SCRIPT_ID: &str = "__HYDRA_STYLES__";

/// Script id of the chunks the server render used.
pub const CHUNK_SCRIPT_ID: &str = "__HYDRA_CHUNKS__";

/// Current flag schema version.
pub const FLAG_VERSION: u32 = 1;

/// Marker telling the client whether the markup came from a successful
/// server render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsrFlag {
    pub v: u32,
    #[serde(rename = "isSSR")]
    pub is_ssr: bool,
}

impl SsrFlag {
    /// Flag for a document whose root markup the client can hydrate.
    pub fn server_rendered() -> Self {
        Self {
            v: FLAG_VERSION,
            is_ssr: true,
        }
    }

    /// Flag for a document whose render failed; the client cold-starts.
    pub fn degraded() -> Self {
        Self {
            v: FLAG_VERSION,
            is_ssr: false,
        }
    }

    /// Encode as script-safe JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let json = serde_json::to_string(self).map_err(SnapshotError::Encode)?;
        Ok(escape_script_json(&json))
    }

    /// Parse a flag payload.
    ///
    /// Anything but a well-formed flag of the current version is treated as
    /// absent.
    pub fn parse(text: &str) -> Option<Self> {
        let flag: Self = serde_json::from_str(text.trim()).ok()?;
        (flag.v == FLAG_VERSION).then_some(flag)
    }
}

/// Encode a style record as a JSON array of ids.
pub fn serialize_style_ids(record: &StyleRecord) -> Result<String, SnapshotError> {
    let json = serde_json::to_string(record).map_err(SnapshotError::Encode)?;
    Ok(escape_script_json(&json))
}

/// Parse a style-id payload.
pub fn parse_style_ids(text: &str) -> Result<StyleRecord, SnapshotError> {
    serde_json::from_str(text).map_err(SnapshotError::Decode)
}

/// Encode a chunk record as a JSON array of ids.
pub fn serialize_chunk_ids(record: &ChunkRecord) -> Result<String, SnapshotError> {
    let json = serde_json::to_string(record).map_err(SnapshotError::Encode)?;
    Ok(escape_script_json(&json))
}

/// Parse a required-chunks payload.
pub fn parse_chunk_ids(text: &str) -> Result<ChunkRecord, SnapshotError> {
    serde_json::from_str(text).map_err(SnapshotError::Decode)
}

/// An inline JSON payload element.
///
/// `json` must already be script-safe.
pub fn payload_script(id: &str, json: &str) -> String {
    format!(
        r#"<script id="{}" type="application/json">{}</script>"#,
        escape_attr(id),
        json
    )
}
