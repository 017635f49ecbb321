//! Error types for the server pipeline.

use hydra_core::ConfigError;
use hydra_render::{ManifestError, RenderError};
use hydra_snapshot::SnapshotError;
use hydra_streaming::StreamError;
use thiserror::Error;

/// Errors surfaced while setting up or driving the pipeline.
///
/// Per-request failures are contained inside the pipeline and reported
/// through the response; these reach callers only from setup code.
#[derive(Error, Debug)]
pub enum HydraError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Chunk manifest error.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Render error.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Snapshot error.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Streaming error.
    #[error("Streaming error: {0}")]
    Stream(#[from] StreamError),
}
