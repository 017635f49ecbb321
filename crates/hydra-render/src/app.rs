//! Application definition shared by server and client.

use std::collections::HashMap;
use std::sync::Arc;

use hydra_router::{RouteEntry, RouteMatch, RouteTable};

use crate::chunk::ChunkManifest;
use crate::component::{component, Component, Outlet};
use crate::engine::{OutletEntry, RenderEngine, RenderError, RenderTree};
use crate::node::el;

/// Element name used for the not-found outlet entry.
pub const NOT_FOUND_ELEMENT: &str = "not-found";

/// Whether a path matched a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Matched,
    NotFound,
}

/// A path resolved against the application.
#[derive(Debug)]
pub struct Resolution<'a> {
    /// Matched route chain, parent first. Empty when not found.
    pub matches: Vec<RouteMatch<'a>>,
    pub tree: RenderTree,
    pub status: RouteStatus,
}

/// Route table, component registry and chunk manifest.
///
/// Built once at process start and read-only afterwards.
#[derive(Clone)]
pub struct Application {
    routes: RouteTable,
    components: HashMap<String, Arc<dyn Component>>,
    shell: Arc<dyn Component>,
    not_found: Arc<dyn Component>,
    manifest: Arc<ChunkManifest>,
}

impl Application {
    /// Create an application from a route table.
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            components: HashMap::new(),
            shell: Arc::new(Outlet),
            not_found: component(|_cx| Ok(el("h1").child("Not Found").into())),
            manifest: Arc::new(ChunkManifest::default()),
        }
    }

    /// Register the component for an element name.
    pub fn component(mut self, element: impl Into<String>, component: Arc<dyn Component>) -> Self {
        self.components.insert(element.into(), component);
        self
    }

    /// Set the root component wrapping every page.
    pub fn with_shell(mut self, shell: Arc<dyn Component>) -> Self {
        self.shell = shell;
        self
    }

    /// Set the component rendered when no route matches.
    pub fn with_not_found(mut self, not_found: Arc<dyn Component>) -> Self {
        self.not_found = not_found;
        self
    }

    /// Set the chunk manifest.
    pub fn with_manifest(mut self, manifest: Arc<ChunkManifest>) -> Self {
        self.manifest = manifest;
        self
    }

    /// Route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Chunk manifest.
    pub fn manifest(&self) -> &Arc<ChunkManifest> {
        &self.manifest
    }

    /// A render engine over this application's manifest.
    pub fn engine(&self) -> RenderEngine {
        RenderEngine::new(self.manifest.clone())
    }

    /// Match `path` and build the tree to render.
    pub fn resolve(&self, path: &str) -> Result<Resolution<'_>, RenderError> {
        let matches = self.routes.match_path(path);

        if matches.is_empty() {
            let outlet = vec![OutletEntry {
                element: NOT_FOUND_ELEMENT.to_string(),
                component: self.not_found.clone(),
                params: Default::default(),
                cache_key: None,
            }];
            return Ok(Resolution {
                matches,
                tree: RenderTree::new(self.shell.clone(), outlet),
                status: RouteStatus::NotFound,
            });
        }

        let outlet = matches
            .iter()
            .map(|m| {
                let component = self
                    .components
                    .get(&m.route.element)
                    .cloned()
                    .ok_or_else(|| RenderError::UnknownComponent(m.route.element.clone()))?;
                Ok(OutletEntry {
                    element: m.route.element.clone(),
                    component,
                    params: m.params.clone(),
                    cache_key: m.cache_key().and_then(Result::ok),
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        Ok(Resolution {
            matches,
            tree: RenderTree::new(self.shell.clone(), outlet),
            status: RouteStatus::Matched,
        })
    }

    /// Route elements with no registered component.
    pub fn validate(&self) -> Vec<RenderError> {
        let mut missing = Vec::new();
        for route in self.routes.routes() {
            self.check(route, &mut missing);
        }
        missing
    }

    fn check(&self, route: &RouteEntry, missing: &mut Vec<RenderError>) {
        if !self.components.contains_key(&route.element) {
            missing.push(RenderError::UnknownComponent(route.element.clone()));
        }
        for child in &route.children {
            self.check(child, missing);
        }
    }
}
