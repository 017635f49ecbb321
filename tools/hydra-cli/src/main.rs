//! Hydra CLI - Command line tool for the hydration SSR pipeline.
//!
//! Commands:
//! - `hydra render` - Server-render a route of the reference application
//! - `hydra inspect` - Read the payloads of a rendered document
//! - `hydra manifest` - Validate a chunk manifest

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{InspectArgs, ManifestArgs, RenderArgs};

/// Hydra CLI - Render and inspect server-rendered documents
#[derive(Parser)]
#[command(name = "hydra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Server-render a path of the reference application
    Render(RenderArgs),

    /// Read the payloads of a rendered document and report the boot decision
    Inspect(InspectArgs),

    /// Validate a chunk manifest
    Manifest(ManifestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
        Commands::Manifest(args) => commands::manifest::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
