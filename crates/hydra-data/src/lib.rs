//! Route data prefetching for the hydration SSR pipeline.
//!
//! This crate provides:
//! - `prefetch` - Concurrent, deduplicated loader fan-out into a `DataCache`
//! - `loader_fn` - Build a `Loader` from an async closure
//! - `TimeoutLoader` - Optional per-loader timeout layer

mod loader;
mod prefetch;
mod timeout;

pub use loader::*;
pub use prefetch::*;
pub use timeout::*;
