//! Depth-first route matching.

use hydra_core::{CacheKey, RouteParams};

use crate::route::{RouteEntry, RouteError};

/// A matched route with its resolved parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched entry.
    pub route: &'a RouteEntry,
    /// Parameters accumulated from the root down to this entry.
    pub params: RouteParams,
    /// Portion of the path matched up to and including this entry.
    pub pathname: String,
}

impl RouteMatch<'_> {
    /// Cache key for this match, if the route declares one.
    pub fn cache_key(&self) -> Option<Result<CacheKey, RouteError>> {
        self.route
            .query_key
            .as_ref()
            .map(|key| key.resolve(&self.params))
    }
}

/// Process-wide, read-only route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level route.
    pub fn route(mut self, route: RouteEntry) -> Self {
        self.routes.push(route);
        self
    }

    /// Top-level routes.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Match a path against the table.
    ///
    /// Returns the matched chain parent-first, so a child's loader can rely
    /// on its parent's entry being earlier in the list. The first route (in
    /// declaration order) whose chain consumes the whole path wins. An empty
    /// result means nothing matched.
    pub fn match_path(&self, path: &str) -> Vec<RouteMatch<'_>> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for route in &self.routes {
            let mut chain = Vec::new();
            if match_route(route, &segments, &RouteParams::new(), "", &mut chain) {
                return chain;
            }
        }

        Vec::new()
    }

    /// Whether any route matches.
    pub fn has_match(&self, path: &str) -> bool {
        !self.match_path(path).is_empty()
    }
}

fn match_route<'a>(
    route: &'a RouteEntry,
    segments: &[&str],
    parent_params: &RouteParams,
    parent_path: &str,
    chain: &mut Vec<RouteMatch<'a>>,
) -> bool {
    let mut params = parent_params.clone();
    let mut consumed = 0;

    for part in route.pattern.split('/').filter(|s| !s.is_empty()) {
        if part == "*" {
            params.insert("*".to_string(), segments[consumed..].join("/"));
            consumed = segments.len();
            break;
        }

        let Some(segment) = segments.get(consumed) else {
            return false;
        };

        match part.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), (*segment).to_string());
            }
            None if part == *segment => {}
            None => return false,
        }
        consumed += 1;
    }

    let mut pathname = parent_path.trim_end_matches('/').to_string();
    for segment in &segments[..consumed] {
        pathname.push('/');
        pathname.push_str(segment);
    }
    if pathname.is_empty() {
        pathname.push('/');
    }

    let remaining = &segments[consumed..];
    let depth = chain.len();
    chain.push(RouteMatch {
        route,
        params: params.clone(),
        pathname: pathname.clone(),
    });

    for child in &route.children {
        if match_route(child, remaining, &params, &pathname, chain) {
            return true;
        }
        chain.truncate(depth + 1);
    }

    if remaining.is_empty() {
        return true;
    }

    chain.truncate(depth);
    false
}
