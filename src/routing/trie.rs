//! Segment tree for route matching
//!
//! Each node owns one pattern segment. Literal children are keyed by their
//! text and always tried before parameter children, so `/users/active` wins
//! over `/users/:id` no matter which was registered first. Parameter
//! children are tried in the order given by [`ParamPriority`], and a failed
//! branch backtracks to the next candidate.
//!
//! The tree is only mutated through `&mut self`. Once it is shared behind an
//! `Arc` for serving, lookups run concurrently without any locking.

use super::matcher::{ParamMatcher, RegexCache};
use super::{BoxedHandler, Params};
use crate::error::{Error, Result};
use crate::middleware::Middleware;
use hyper::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Order in which sibling parameter segments are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamPriority {
    /// First registered, first tried
    #[default]
    InsertionOrder,
    /// Regex-constrained before plain named before wildcard; insertion order
    /// within the same kind
    ConstrainedFirst,
}

/// Handler and route-level middleware registered for one method on a node
pub struct Endpoint {
    pub handler: BoxedHandler,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub pattern: String,
}

/// A registered route, as listed by [`Tree::routes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescription {
    pub method: Method,
    pub pattern: String,
    pub middleware: Vec<String>,
}

struct Node {
    matcher: ParamMatcher,
    endpoints: IndexMap<Method, Endpoint>,
    static_children: IndexMap<String, Node>,
    param_children: Vec<Node>,
}

impl Node {
    fn new(matcher: ParamMatcher) -> Self {
        Self {
            matcher,
            endpoints: IndexMap::new(),
            static_children: IndexMap::new(),
            param_children: Vec::new(),
        }
    }

    fn child_mut(&mut self, matcher: ParamMatcher, priority: ParamPriority) -> &mut Node {
        if matcher.is_static() {
            return self
                .static_children
                .entry(matcher.clause().to_string())
                .or_insert_with(|| Node::new(matcher));
        }

        let index = match self
            .param_children
            .iter()
            .position(|child| child.matcher.clause() == matcher.clause())
        {
            Some(existing) => existing,
            None => {
                let at = match priority {
                    ParamPriority::InsertionOrder => self.param_children.len(),
                    ParamPriority::ConstrainedFirst => self
                        .param_children
                        .iter()
                        .position(|child| child.matcher.kind() > matcher.kind())
                        .unwrap_or(self.param_children.len()),
                };
                self.param_children.insert(at, Node::new(matcher));
                at
            }
        };
        &mut self.param_children[index]
    }

    fn find<'n, 'p>(
        &'n self,
        method: &Method,
        segments: &'p [Cow<'p, str>],
        captures: &mut Vec<(&'n str, &'p str)>,
    ) -> Option<&'n Endpoint> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.endpoints.get(method);
        };

        // Exact matches first
        if let Some(child) = self.static_children.get(&**segment) {
            if let Some(endpoint) = child.find(method, rest, captures) {
                return Some(endpoint);
            }
        }

        for child in &self.param_children {
            if let Some(value) = child.matcher.matches(segment) {
                captures.push((child.matcher.name(), value));
                if let Some(endpoint) = child.find(method, rest, captures) {
                    return Some(endpoint);
                }
                captures.pop();
            }
        }

        None
    }

    fn collect(&self, out: &mut Vec<RouteDescription>) {
        for (method, endpoint) in &self.endpoints {
            out.push(RouteDescription {
                method: method.clone(),
                pattern: endpoint.pattern.clone(),
                middleware: endpoint
                    .middleware
                    .iter()
                    .map(|m| m.name().to_string())
                    .collect(),
            });
        }
        for child in self.static_children.values() {
            child.collect(out);
        }
        for child in &self.param_children {
            child.collect(out);
        }
    }
}

/// Route tree keyed by path segments, with per-method endpoints on terminal nodes
pub struct Tree {
    root: Node,
    cache: Arc<RegexCache>,
    priority: ParamPriority,
    route_count: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(RegexCache::new()), ParamPriority::default())
    }

    /// Build a tree that compiles constraints through a shared cache
    pub fn with_cache(cache: Arc<RegexCache>, priority: ParamPriority) -> Self {
        Self {
            root: Node::new(ParamMatcher::literal("")),
            cache,
            priority,
            route_count: 0,
        }
    }

    /// Insert a route. `pattern` is expected to be normalized already.
    ///
    /// Every segment is parsed before the tree is touched, so a bad
    /// constraint leaves the tree unchanged.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<()> {
        let matchers = split_segments(pattern)
            .map(|segment| ParamMatcher::parse(segment, pattern, &self.cache))
            .collect::<Result<Vec<_>>>()?;

        let priority = self.priority;
        let mut node = &mut self.root;
        for matcher in matchers {
            node = node.child_mut(matcher, priority);
        }

        if node.endpoints.contains_key(&method) {
            return Err(Error::DuplicateRoute {
                method: method.to_string(),
                pattern: pattern.to_string(),
            });
        }

        log::debug!("Registered route {} {}", method, pattern);
        node.endpoints.insert(
            method,
            Endpoint {
                handler,
                middleware,
                pattern: pattern.to_string(),
            },
        );
        self.route_count += 1;
        Ok(())
    }

    /// Match a request path. The query string, if any, is ignored.
    pub fn find(&self, method: &Method, path: &str) -> Option<(&Endpoint, Params)> {
        let path_only = match path.find('?') {
            Some(query_start) => &path[..query_start],
            None => path,
        };

        let mut segments: Vec<Cow<'_, str>> = split_segments(path_only)
            .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
            .collect();

        // A trailing slash is an empty last segment, which only a wildcard
        // accepts. Without a wildcard there the slash is ignored.
        if path_only.len() > 1 && path_only.ends_with('/') {
            segments.push(Cow::Borrowed(""));
            let mut captures = Vec::new();
            if let Some(endpoint) = self.root.find(method, &segments, &mut captures) {
                return Some((endpoint, captures.into_iter().collect()));
            }
            segments.pop();
        }

        let mut captures = Vec::new();
        let endpoint = self.root.find(method, &segments, &mut captures)?;
        Some((endpoint, captures.into_iter().collect()))
    }

    /// All registered routes, literal branches before parameter branches
    pub fn routes(&self) -> Vec<RouteDescription> {
        let mut out = Vec::with_capacity(self.route_count);
        self.root.collect(&mut out);
        out
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn regex_cache(&self) -> &Arc<RegexCache> {
        &self.cache
    }

    pub fn priority(&self) -> ParamPriority {
        self.priority
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::http::Request;
    use crate::routing::{handler_fn, Handler};

    fn tagged(tag: &'static str) -> BoxedHandler {
        Arc::new(handler_fn(move |ctx: &mut Context| {
            Box::pin(async move { ctx.text(200, tag) })
        }))
    }

    fn add(tree: &mut Tree, method: Method, pattern: &str, tag: &'static str) {
        tree.insert(method, pattern, tagged(tag), Vec::new()).unwrap();
    }

    fn pattern_of(tree: &Tree, method: Method, path: &str) -> Option<String> {
        tree.find(&method, path).map(|(e, _)| e.pattern.clone())
    }

    #[test]
    fn test_static_routes() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/", "root");
        add(&mut tree, Method::GET, "/users", "users");
        add(&mut tree, Method::GET, "/users/profile", "profile");

        assert_eq!(pattern_of(&tree, Method::GET, "/").as_deref(), Some("/"));
        assert_eq!(pattern_of(&tree, Method::GET, "/users").as_deref(), Some("/users"));
        assert_eq!(
            pattern_of(&tree, Method::GET, "/users/profile").as_deref(),
            Some("/users/profile")
        );
        assert!(tree.find(&Method::GET, "/nonexistent").is_none());
        assert!(tree.find(&Method::POST, "/users").is_none());
    }

    #[test]
    fn test_parameter_routes() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/users/:id", "user");
        add(&mut tree, Method::GET, "/users/:id/posts/:post_id", "post");

        let (_, params) = tree.find(&Method::GET, "/users/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));

        let (_, params) = tree.find(&Method::GET, "/users/456/posts/789").unwrap();
        assert_eq!(params.get("id"), Some("456"));
        assert_eq!(params.get("post_id"), Some("789"));
    }

    #[test]
    fn test_literal_wins_even_when_registered_last() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/user/:id", "param");
        add(&mut tree, Method::GET, "/user/active", "literal");

        let (endpoint, params) = tree.find(&Method::GET, "/user/active").unwrap();
        assert_eq!(endpoint.pattern, "/user/active");
        assert!(params.is_empty());

        let (endpoint, params) = tree.find(&Method::GET, "/user/42").unwrap();
        assert_eq!(endpoint.pattern, "/user/:id");
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn test_backtracks_out_of_dead_literal_branch() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/files/static/index", "literal");
        add(&mut tree, Method::GET, "/files/:dir/list", "param");

        let (endpoint, params) = tree.find(&Method::GET, "/files/static/list").unwrap();
        assert_eq!(endpoint.pattern, "/files/:dir/list");
        assert_eq!(params.get("dir"), Some("static"));
    }

    #[test]
    fn test_backtracking_drops_stale_captures() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/a/:first/x", "first");
        add(&mut tree, Method::GET, "/a/:second/y", "second");

        let (endpoint, params) = tree.find(&Method::GET, "/a/v/y").unwrap();
        assert_eq!(endpoint.pattern, "/a/:second/y");
        assert_eq!(params.get("second"), Some("v"));
        assert!(!params.contains("first"));
    }

    #[test]
    fn test_method_mismatch_keeps_searching() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/items/new", "form");
        add(&mut tree, Method::POST, "/items/:name", "create");

        let (endpoint, params) = tree.find(&Method::POST, "/items/new").unwrap();
        assert_eq!(endpoint.pattern, "/items/:name");
        assert_eq!(params.get("name"), Some("new"));
    }

    #[test]
    fn test_regex_route() {
        let mut tree = Tree::new();
        add(
            &mut tree,
            Method::GET,
            r"/hello/world/:email([a-zA-Z0-9]+@[a-zA-Z0-9]+\.[a-zA-Z0-9]+)",
            "email",
        );

        let (_, params) = tree.find(&Method::GET, "/hello/world/a@b.com").unwrap();
        assert_eq!(params.get("email"), Some("a@b.com"));
        assert!(tree.find(&Method::GET, "/hello/world/not-an-email").is_none());
    }

    #[test]
    fn test_wildcard_matches_one_segment() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/static/*", "asset");

        let (_, params) = tree.find(&Method::GET, "/static/app.js").unwrap();
        assert_eq!(params.get("*"), Some("app.js"));
        assert!(tree.find(&Method::GET, "/static/js/app.js").is_none());
    }

    #[test]
    fn test_trailing_slash_reaches_wildcard_as_empty_segment() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/static/*", "asset");
        add(&mut tree, Method::GET, "/users/:id", "user");

        let (endpoint, params) = tree.find(&Method::GET, "/static/").unwrap();
        assert_eq!(endpoint.pattern, "/static/*");
        assert_eq!(params.get("*"), Some(""));
        assert!(tree.find(&Method::GET, "/static").is_none());

        let (_, params) = tree.find(&Method::GET, "/static/app.js/").unwrap();
        assert_eq!(params.get("*"), Some("app.js"));
        let (_, params) = tree.find(&Method::GET, "/users/7/").unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert!(tree.find(&Method::GET, "/users/").is_none());
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/users/:id", "first");

        let err = tree
            .insert(Method::GET, "/users/:id", tagged("second"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { .. }));
        assert_eq!(tree.route_count(), 1);

        // Other methods on the same pattern are fine
        add(&mut tree, Method::DELETE, "/users/:id", "delete");
        assert_eq!(tree.route_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_keeps_first_handler() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/ping", "first");
        let _ = tree.insert(Method::GET, "/ping", tagged("second"), Vec::new());

        let (endpoint, _) = tree.find(&Method::GET, "/ping").unwrap();
        let mut ctx = Context::new(Request::new(Method::GET, "/ping"));
        endpoint.handler.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.res.body, b"first");
    }

    #[test]
    fn test_bad_regex_leaves_tree_untouched() {
        let mut tree = Tree::new();
        let err = tree
            .insert(Method::GET, "/a/b/:id([0-9)", tagged("bad"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRegex { .. }));
        assert_eq!(tree.route_count(), 0);
        assert!(tree.routes().is_empty());
    }

    #[test]
    fn test_insertion_order_priority() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/v/:any", "named");
        add(&mut tree, Method::GET, "/v/:num([0-9]+)", "regex");

        let (endpoint, _) = tree.find(&Method::GET, "/v/12").unwrap();
        assert_eq!(endpoint.pattern, "/v/:any");
    }

    #[test]
    fn test_constrained_first_priority() {
        let mut tree = Tree::with_cache(
            Arc::new(RegexCache::new()),
            ParamPriority::ConstrainedFirst,
        );
        add(&mut tree, Method::GET, "/v/*", "wildcard");
        add(&mut tree, Method::GET, "/v/:any", "named");
        add(&mut tree, Method::GET, "/v/:num([0-9]+)", "regex");

        let (endpoint, params) = tree.find(&Method::GET, "/v/12").unwrap();
        assert_eq!(endpoint.pattern, "/v/:num([0-9]+)");
        assert_eq!(params.get("num"), Some("12"));

        let (endpoint, _) = tree.find(&Method::GET, "/v/abc").unwrap();
        assert_eq!(endpoint.pattern, "/v/:any");
    }

    #[test]
    fn test_insertion_order_independence() {
        let patterns = [
            "/",
            "/users",
            "/users/:id",
            "/users/:id/posts",
            "/posts/:slug([a-z-]+)",
            "/assets/*",
        ];
        let paths = [
            "/",
            "/users",
            "/users/9",
            "/users/9/posts",
            "/posts/hello-world",
            "/posts/Nope",
            "/assets/logo.png",
            "/missing",
        ];

        let mut forward = Tree::new();
        for p in patterns {
            add(&mut forward, Method::GET, p, "x");
        }
        let mut backward = Tree::new();
        for p in patterns.iter().rev() {
            add(&mut backward, Method::GET, p, "x");
        }

        for path in paths {
            let a = forward.find(&Method::GET, path);
            let b = backward.find(&Method::GET, path);
            assert_eq!(
                a.map(|(e, p)| (e.pattern.clone(), p)),
                b.map(|(e, p)| (e.pattern.clone(), p)),
                "diverged on {}",
                path
            );
        }
    }

    #[test]
    fn test_query_and_trailing_slash_ignored() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/search", "search");

        assert!(tree.find(&Method::GET, "/search?q=test&limit=10").is_some());
        assert!(tree.find(&Method::GET, "/search?").is_some());
        assert!(tree.find(&Method::GET, "/search/").is_some());
    }

    #[test]
    fn test_percent_decoded_captures() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/tags/:name", "tag");

        let (_, params) = tree.find(&Method::GET, "/tags/hello%20world").unwrap();
        assert_eq!(params.get("name"), Some("hello world"));
    }

    #[test]
    fn test_routes_listing() {
        let mut tree = Tree::new();
        add(&mut tree, Method::GET, "/users/:id", "user");
        add(&mut tree, Method::GET, "/users", "users");
        add(&mut tree, Method::POST, "/users", "create");

        let routes: Vec<(Method, String)> = tree
            .routes()
            .into_iter()
            .map(|r| (r.method, r.pattern))
            .collect();
        assert_eq!(
            routes,
            vec![
                (Method::GET, "/users".to_string()),
                (Method::POST, "/users".to_string()),
                (Method::GET, "/users/:id".to_string()),
            ]
        );
    }
}
