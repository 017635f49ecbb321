//! Nested route matching for the hydration SSR pipeline.
//!
//! ```rust,ignore
//! use hydra_router::{QueryKey, RouteEntry, RouteTable};
//!
//! let table = RouteTable::new().route(
//!     RouteEntry::new("/", "Layout").child(
//!         RouteEntry::new("agents/:id", "AgentPage")
//!             .with_query_key(QueryKey::new(["agent", ":id"]))
//!             .with_loader(agent_loader),
//!     ),
//! );
//!
//! let matches = table.match_path("/agents/7");
//! assert_eq!(matches.len(), 2); // Layout, then AgentPage
//! ```

mod matcher;
mod route;

pub use matcher::*;
pub use route::*;
