//! Server-side rendering pipeline.
//!
//! `SsrPipeline` runs one request through every stage:
//! route match, concurrent prefetch, render (buffered or behind the
//! all-ready signal), dehydration, document assembly and the
//! backpressure-aware write to the transport.

mod error;
mod pipeline;
mod response;

pub use error::*;
pub use pipeline::*;
pub use response::*;
