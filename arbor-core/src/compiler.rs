// Flat lookup table for routes without parameters

use crate::pattern::RoutePattern;
use crate::router::Router;
use crate::HttpMethod;
use std::collections::HashMap;
use std::sync::Arc;

/// `path -> method -> value` for every static route of a router.
///
/// Lookups follow the trie's rule at a single node: the exact method
/// first, then a route registered for every method.
#[derive(Debug)]
pub struct StaticTable<T> {
    paths: HashMap<String, HashMap<HttpMethod, (Arc<RoutePattern>, Arc<T>)>>,
}

impl<T> Default for StaticTable<T> {
    fn default() -> Self {
        Self {
            paths: HashMap::new(),
        }
    }
}

impl<T> StaticTable<T> {
    /// Snapshot the static routes of `router`
    pub fn build(router: &Router<T>) -> Self {
        let mut paths: HashMap<String, HashMap<HttpMethod, _>> = HashMap::new();
        for (method, pattern, value) in router.static_routes() {
            paths
                .entry(pattern.canonical())
                .or_default()
                .insert(method, (pattern, value));
        }
        Self { paths }
    }

    /// Look up a normalized path (leading slash, no empty segments)
    pub fn lookup(&self, method: HttpMethod, path: &str) -> Option<(&Arc<RoutePattern>, &Arc<T>)> {
        let methods = self.paths.get(path)?;
        methods
            .get(&method)
            .or_else(|| methods.get(&HttpMethod::All))
            .map(|(pattern, value)| (pattern, value))
    }

    /// Number of distinct static paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
