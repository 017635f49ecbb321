//! CLI command implementations.

pub mod inspect;
pub mod manifest;
pub mod render;

use clap::Args;

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Request path, with optional query string.
    #[arg(default_value = "/agents")]
    pub path: String,

    /// Render buffered instead of streaming.
    #[arg(long)]
    pub buffered: bool,

    /// Bytes per write to the transport.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Transport buffer depth, in writes.
    #[arg(long, default_value_t = 4)]
    pub buffer: usize,

    /// Simulated loader latency in milliseconds.
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Request id to send as `x-request-id`.
    #[arg(long)]
    pub request_id: Option<String>,

    /// Write the document to a file.
    #[arg(short, long)]
    pub out: Option<String>,

    /// Print the document to stdout.
    #[arg(short, long)]
    pub print: bool,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Rendered HTML document.
    pub file: String,

    /// Boot the reference application against the document at this location.
    #[arg(long)]
    pub boot: Option<String>,
}

/// Arguments for the manifest command.
#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest file (default: the configured manifest).
    pub file: Option<String>,

    /// Show the files a set of chunks resolves to.
    #[arg(short, long)]
    pub resolve: Vec<String>,
}
