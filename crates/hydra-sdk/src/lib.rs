//! Public SDK for the hydration SSR pipeline.
//!
//! This crate re-exports all pipeline functionality:
//!
//! ```ignore
//! use hydra_sdk::prelude::*;
//!
//! let routes = RouteTable::new().route(
//!     RouteEntry::new("/agents/:id", "Agent")
//!         .with_query_key(QueryKey::new(["agent", ":id"]))
//!         .with_loader(loader_fn("agent", |p: RouteParams| async move {
//!             fetch_agent(&p["id"]).await
//!         })),
//! );
//!
//! let app = Application::new(routes).component(
//!     "Agent",
//!     component(|cx: &mut RenderScope<'_>| {
//!         let agent = cx.route_data::<Agent>().ready();
//!         Ok(el("h1").child(agent.map(|a| a.name).unwrap_or_default()).into())
//!     }),
//! );
//!
//! let pipeline = SsrPipeline::from_config(app, AppConfig::load("hydra.toml")?)?;
//! let (response, summary) = pipeline.serve(&mut RequestContext::get("/agents/7"), sink).await;
//! ```

pub use hydra_client;
pub use hydra_core;
pub use hydra_data;
pub use hydra_render;
pub use hydra_router;
pub use hydra_server;
pub use hydra_snapshot;
pub use hydra_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use hydra_client::*;
    pub use hydra_core::*;
    pub use hydra_data::*;
    pub use hydra_render::*;
    pub use hydra_router::*;
    pub use hydra_server::*;
    pub use hydra_snapshot::*;
    pub use hydra_streaming::*;
}
