//! Client bootstrap for the hydration SSR pipeline.
//!
//! This crate provides:
//! - `Dom` - What the client needs from the host document
//! - `HtmlDocument` - A `Dom` over a markup string
//! - `Bootstrap` - Restore state from the payload scripts, then hydrate or
//!   cold-start
//! - `ClientRuntime` - Post-boot navigation against the live cache

mod bootstrap;
mod dom;
mod runtime;

pub use bootstrap::*;
pub use dom::*;
pub use runtime::*;
