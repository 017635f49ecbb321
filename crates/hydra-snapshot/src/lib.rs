//! Snapshot serialization for the hydration SSR pipeline.
//!
//! This crate provides:
//! - `serialize` / `deserialize` - Terminal-state `DataCache` to and from JSON
//! - `SsrFlag` - Versioned "this document was server-rendered" marker
//! - Style-id and required-chunk companion payloads
//! - `escape_script_json` - Makes JSON safe inside a `<script>` element

mod dehydrate;
mod escape;
mod payload;

pub use dehydrate::*;
pub use escape::*;
pub use payload::*;

/// Snapshot error.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}
