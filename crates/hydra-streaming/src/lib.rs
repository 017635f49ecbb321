//! Document assembly and response streaming.
//!
//! This crate provides:
//! - `HeadContent` / `DocumentParts` - The pieces of one server-rendered page
//! - `assemble` - Composes them in the fixed order the client bootstrap relies on
//! - `StreamWriter` - Chunked, backpressure-aware writes to any `Sink<Vec<u8>>`

mod document;
mod writer;

pub use document::*;
pub use writer::*;
