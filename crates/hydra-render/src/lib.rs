//! Render engine for the hydration SSR pipeline.
//!
//! This crate provides:
//! - `Node` / `Element` - The markup tree components return
//! - `Component` - Renderable unit, plus `ErrorBoundary` and `Lazy`
//! - `RenderScope` - Per-render access to data, styles, chunks and outlets
//! - `StyleExtractor` - Idempotent, ordered style-rule recording
//! - `ChunkExtractor` / `ChunkManifest` - Code-split chunk recording
//! - `RenderEngine` - Buffered and streaming render with failure containment
//! - `Application` - Route table plus component registry, shared by server
//!   and client so both render the same tree

mod app;
mod chunk;
mod component;
mod engine;
mod escape;
mod node;
mod scope;
mod style;

pub use app::*;
pub use chunk::*;
pub use component::*;
pub use engine::*;
pub use escape::*;
pub use node::*;
pub use scope::*;
pub use style::*;
