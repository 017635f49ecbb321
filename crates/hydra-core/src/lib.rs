//! Core abstractions for the hydration SSR pipeline.
//!
//! This crate provides the per-request types every other stage shares:
//! - `RequestContext` - Request-scoped state (path, query, data cache)
//! - `DataCache` - Keyed loader results with terminal/pending status
//! - `Loader` - The data-loading seam route entries plug into
//! - `TimingContext` / `LifecyclePhase` - Request lifecycle tracking
//! - `AppConfig` - Document, render, stream and asset configuration

mod cache;
mod config;
mod context;
mod lifecycle;
mod loader;

pub use cache::*;
pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use loader::*;
