//! Segment trie with backtracking.
//!
//! Every node has three kinds of outgoing edges: literal children keyed by
//! segment text, at most one parameter child, and at most one wildcard
//! child. Resolution is a depth-first search that tries them in that order
//! at every depth and backs out of a branch that cannot produce a full
//! match, so `/user/admin/settings` beats `/user/:id/profile` and
//! `/a/b/:y` beats `/a/:x/c` for `/a/b/c`.
//!
//! The trie only records the shape of a pattern. Captured values are
//! collected by position and named after the matched route's own pattern,
//! which keeps `/user/:id/x` and `/user/:name/y` independent even though
//! they share the parameter edge.
//!
//! A node whose path matches but which has no handler for the request
//! method does not end the search: lower precedence branches are still
//! tried, and if none matches the methods seen along the way are reported
//! so the caller can answer 405.

use crate::http::HttpMethod;
use crate::pattern::{RoutePattern, Segment, split_path};
use crate::Error;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Captured path parameters, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: SmallVec<[(String, String); 4]>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameters as a JSON object of strings
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

/// A successful lookup
#[derive(Debug)]
pub struct Match<T> {
    pub value: Arc<T>,
    pub pattern: Arc<RoutePattern>,
    pub params: Params,
}

/// Outcome of [`Router::resolve`]
#[derive(Debug)]
pub enum Resolution<T> {
    Found(Match<T>),
    /// The path exists but not for this method
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    NotFound,
}

impl<T> Resolution<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

#[derive(Debug)]
struct Leaf<T> {
    pattern: Arc<RoutePattern>,
    value: Arc<T>,
}

#[derive(Debug)]
struct Node<T> {
    statics: HashMap<String, Node<T>>,
    param: Option<Box<Node<T>>>,
    wildcard: Option<Box<Node<T>>>,
    methods: HashMap<HttpMethod, Leaf<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            param: None,
            wildcard: None,
            methods: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    Segment(usize),
    Rest(usize),
}

impl<T> Node<T> {
    /// Exact method first, then the catch-all
    fn leaf_for(&self, method: HttpMethod) -> Option<&Leaf<T>> {
        self.methods
            .get(&method)
            .or_else(|| self.methods.get(&HttpMethod::All))
    }

    fn search<'n>(
        &'n self,
        segments: &[&str],
        depth: usize,
        method: HttpMethod,
        captures: &mut SmallVec<[Capture; 8]>,
        allowed: &mut Vec<HttpMethod>,
    ) -> Option<&'n Leaf<T>> {
        if depth == segments.len() {
            if let Some(leaf) = self.leaf_for(method) {
                return Some(leaf);
            }
            allowed.extend(self.methods.keys().copied());
            return None;
        }

        // Static children have the highest precedence
        if let Some(child) = self.statics.get(segments[depth]) {
            if let Some(leaf) = child.search(segments, depth + 1, method, captures, allowed) {
                return Some(leaf);
            }
        }

        if let Some(child) = &self.param {
            captures.push(Capture::Segment(depth));
            if let Some(leaf) = child.search(segments, depth + 1, method, captures, allowed) {
                return Some(leaf);
            }
            // Backtrack
            captures.pop();
        }

        if let Some(child) = &self.wildcard {
            if let Some(leaf) = child.leaf_for(method) {
                captures.push(Capture::Rest(depth));
                return Some(leaf);
            }
            allowed.extend(child.methods.keys().copied());
        }

        None
    }

    fn collect(&self, out: &mut Vec<(HttpMethod, Arc<RoutePattern>)>) {
        for (method, leaf) in &self.methods {
            out.push((*method, Arc::clone(&leaf.pattern)));
        }
        for child in self.statics.values() {
            child.collect(out);
        }
        if let Some(child) = &self.param {
            child.collect(out);
        }
        if let Some(child) = &self.wildcard {
            child.collect(out);
        }
    }

    fn collect_static<'n>(&'n self, out: &mut Vec<(HttpMethod, &'n Leaf<T>)>) {
        for (method, leaf) in &self.methods {
            if leaf.pattern.is_static() {
                out.push((*method, leaf));
            }
        }
        for child in self.statics.values() {
            child.collect_static(out);
        }
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Route table mapping `(method, pattern)` to values of type `T`
#[derive(Debug)]
pub struct Router<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` on `pattern`.
    ///
    /// Patterns that differ only in parameter names occupy the same trie
    /// position, so registering both for one method is a duplicate.
    pub fn insert(
        &mut self,
        method: HttpMethod,
        pattern: RoutePattern,
        value: T,
    ) -> Result<Arc<T>, Error> {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Static(literal) => node.statics.entry(literal.clone()).or_default(),
                Segment::Param(_) => &mut **node.param.get_or_insert_with(Box::default),
                Segment::Wildcard => &mut **node.wildcard.get_or_insert_with(Box::default),
            };
        }

        if node.methods.contains_key(&method) {
            return Err(Error::DuplicateRoute {
                method,
                pattern: pattern.raw().to_string(),
            });
        }

        let value = Arc::new(value);
        node.methods.insert(
            method,
            Leaf {
                pattern: Arc::new(pattern),
                value: Arc::clone(&value),
            },
        );
        self.len += 1;
        Ok(value)
    }

    /// Resolve a request path
    pub fn resolve(&self, method: HttpMethod, path: &str) -> Resolution<T> {
        let segments = split_path(path);
        self.resolve_segments(method, &segments)
    }

    /// Resolve an already split path
    pub fn resolve_segments(&self, method: HttpMethod, segments: &[&str]) -> Resolution<T> {
        let mut captures = SmallVec::new();
        let mut allowed = Vec::new();

        match self
            .root
            .search(segments, 0, method, &mut captures, &mut allowed)
        {
            Some(leaf) => {
                let mut params = Params::new();
                for (name, capture) in leaf.pattern.param_names().zip(captures.iter()) {
                    let value = match *capture {
                        Capture::Segment(index) => decode(segments[index]),
                        Capture::Rest(start) => decode(&segments[start..].join("/")),
                    };
                    params.push(name, value);
                }
                Resolution::Found(Match {
                    value: Arc::clone(&leaf.value),
                    pattern: Arc::clone(&leaf.pattern),
                    params,
                })
            }
            None if allowed.is_empty() => Resolution::NotFound,
            None => {
                allowed.sort_unstable();
                allowed.dedup();
                Resolution::MethodNotAllowed { allowed }
            }
        }
    }

    /// Every registered `(method, pattern)`, sorted by pattern then method
    pub fn routes(&self) -> Vec<(HttpMethod, Arc<RoutePattern>)> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_by(|a, b| a.1.raw().cmp(b.1.raw()).then(a.0.cmp(&b.0)));
        out
    }

    /// Routes whose pattern has no parameters or wildcard
    pub fn static_routes(&self) -> Vec<(HttpMethod, Arc<RoutePattern>, Arc<T>)> {
        let mut leaves = Vec::new();
        self.root.collect_static(&mut leaves);
        leaves
            .into_iter()
            .map(|(method, leaf)| (method, Arc::clone(&leaf.pattern), Arc::clone(&leaf.value)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
