//! Agent portal - Reference application.
//!
//! Demonstrates the hydration pipeline with:
//! - A shared layout whose loader key is also used by a child page
//! - Code-split detail pages behind `Lazy` boundaries
//! - An error boundary around a fragile panel
//! - A server redirect from the index route

mod data;
mod pages;

use std::sync::Arc;

use anyhow::anyhow;
use hydra_sdk::prelude::*;

pub use data::*;

/// Chunk id of the agent detail page.
pub const AGENT_DETAIL_CHUNK: &str = "agent-detail";
/// Chunk id of the job detail page.
pub const JOB_DETAIL_CHUNK: &str = "job-detail";

/// Route table backed by `store`.
pub fn portal_routes(store: Arc<PortalStore>) -> RouteTable {
    let agents = {
        let store = store.clone();
        loader_fn("agents", move |_params: RouteParams| {
            let store = store.clone();
            async move { store.list_agents().await }
        })
    };
    let agent = agent_loader(store.clone());
    let job = job_loader(store);

    RouteTable::new().route(
        RouteEntry::new("/", "Layout")
            .with_query_key(QueryKey::new(["agents"]))
            .with_loader(agents.clone())
            .child(RouteEntry::new("", "Home"))
            .child(
                RouteEntry::new("agents", "AgentList")
                    .with_query_key(QueryKey::new(["agents"]))
                    .with_loader(agents),
            )
            .child(
                RouteEntry::new("agents/:id", "AgentDetail")
                    .with_query_key(QueryKey::new(["agent", ":id"]))
                    .with_loader(agent),
            )
            .child(
                RouteEntry::new("jobs/:job_id", "JobDetail")
                    .with_query_key(QueryKey::new(["job", ":job_id"]))
                    .with_loader(job),
            ),
    )
}

fn agent_loader(store: Arc<PortalStore>) -> Arc<dyn Loader> {
    loader_fn("agent", move |params: RouteParams| {
        let store = store.clone();
        async move {
            let id = required_param(&params, "id")?;
            store.agent(id).await
        }
    })
}

fn job_loader(store: Arc<PortalStore>) -> Arc<dyn Loader> {
    loader_fn("job", move |params: RouteParams| {
        let store = store.clone();
        async move {
            let id = required_param(&params, "job_id")?;
            store.job(id).await
        }
    })
}

fn required_param<'a>(params: &'a RouteParams, name: &str) -> anyhow::Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing path parameter: {}", name))
}

/// Chunk manifest as the bundler would emit it for this application.
pub fn portal_manifest() -> ChunkManifest {
    ChunkManifest::new("/static/")
        .with_entrypoint("main")
        .with_chunk(
            "main",
            ChunkAssets {
                scripts: vec!["main.js".into()],
                styles: vec!["main.css".into()],
                imports: Vec::new(),
            },
        )
        .with_chunk(
            "ui-shared",
            ChunkAssets {
                scripts: vec!["ui-shared.js".into()],
                ..ChunkAssets::default()
            },
        )
        .with_chunk(
            AGENT_DETAIL_CHUNK,
            ChunkAssets {
                scripts: vec!["agent-detail.js".into()],
                imports: vec!["ui-shared".into()],
                ..ChunkAssets::default()
            },
        )
        .with_chunk(
            JOB_DETAIL_CHUNK,
            ChunkAssets {
                scripts: vec!["job-detail.js".into()],
                styles: vec!["job-detail.css".into()],
                imports: vec!["ui-shared".into()],
            },
        )
}

/// The application: routes, components and manifest.
///
/// Server and client build it the same way so both render the same tree.
pub fn portal_app(store: Arc<PortalStore>) -> Application {
    Application::new(portal_routes(store))
        .with_shell(Arc::new(Outlet))
        .with_not_found(component(pages::not_found))
        .with_manifest(Arc::new(portal_manifest()))
        .component("Layout", component(pages::layout))
        .component("Home", component(pages::home))
        .component("AgentList", component(pages::agent_list))
        .component(
            "AgentDetail",
            Arc::new(Lazy::new(AGENT_DETAIL_CHUNK, component(pages::agent_detail))),
        )
        .component(
            "JobDetail",
            Arc::new(Lazy::new(JOB_DETAIL_CHUNK, component(pages::job_detail))),
        )
}

/// Default configuration for the portal.
pub fn portal_config() -> AppConfig {
    let mut config = AppConfig::default().with_title("Agent Portal");
    config
        .document
        .meta
        .push(("viewport".to_string(), "width=device-width, initial-scale=1".to_string()));
    config
}

/// A ready-to-serve pipeline over `store`.
pub fn portal_pipeline(store: Arc<PortalStore>, config: AppConfig) -> SsrPipeline {
    SsrPipeline::new(Arc::new(portal_app(store)), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_is_consistent() {
        assert!(portal_manifest().validate().is_empty());
    }

    #[test]
    fn test_every_route_has_a_component() {
        let app = portal_app(Arc::new(PortalStore::sample()));
        assert!(app.validate().is_empty());
    }

    #[tokio::test]
    async fn test_loader_without_param_fails_without_loading() {
        let store = Arc::new(PortalStore::sample());

        let err = agent_loader(store.clone())
            .load(&RouteParams::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing path parameter: id");
        assert!(job_loader(store.clone()).load(&RouteParams::new()).await.is_err());
        assert_eq!(store.loads(), 0);

        let params = RouteParams::from([("job_id".to_string(), "101".to_string())]);
        assert!(job_loader(store.clone()).load(&params).await.is_ok());
        assert_eq!(store.loads(), 1);
    }

    #[test]
    fn test_layout_and_list_share_a_key() {
        let routes = portal_routes(Arc::new(PortalStore::sample()));
        let matches = routes.match_path("/agents");

        assert_eq!(matches.len(), 2);
        let keys: Vec<_> = matches.iter().filter_map(|m| m.cache_key().and_then(Result::ok)).collect();
        assert_eq!(keys[0], keys[1]);
    }
}
