pub mod group;
pub mod matcher;
pub mod router;
pub mod trie;

use crate::context::Context;
use crate::error::Result;
use crate::middleware::Middleware;
use async_trait::async_trait;
use hyper::Method;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use group::Group;
pub use matcher::{ParamKind, ParamMatcher, RegexCache};
pub use router::{ErrorHandler, RouteMatch, Router};
pub use trie::{ParamPriority, RouteDescription, Tree};

/// Boxed future returned by handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything that can serve a request by modifying the context in place
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: &mut Context) -> Result<()>;
}

#[async_trait]
impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        (self)(ctx).await
    }
}

/// Shared, type-erased handler
pub type BoxedHandler = Arc<dyn Handler>;

/// Pin down the higher-ranked signature of a handler closure.
///
/// ```rust,ignore
/// let hello = handler_fn(|ctx| Box::pin(async move { ctx.text(200, "hi") }));
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    f
}

/// Path parameters captured while matching a route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One route registration: method, path, handler and route-level middleware
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler: BoxedHandler,
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl Route {
    pub fn new<H: Handler>(method: Method, path: &str, handler: H) -> Self {
        Self {
            method,
            path: path.to_string(),
            handler: Arc::new(handler),
            middleware: Vec::new(),
        }
    }

    pub fn get<H: Handler>(path: &str, handler: H) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post<H: Handler>(path: &str, handler: H) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn put<H: Handler>(path: &str, handler: H) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    pub fn delete<H: Handler>(path: &str, handler: H) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    pub fn patch<H: Handler>(path: &str, handler: H) -> Self {
        Self::new(Method::PATCH, path, handler)
    }

    /// Append a route-level middleware; the last one added sits closest to the handler
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append a middleware that is shared with other routes
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Normalize a route pattern: one leading `/`, no repeated or trailing `/`
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Join a prefix and a path with exactly one `/` between them
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{}/{}", prefix, path))
}

// Utility macro for creating routes from `async fn(&mut Context) -> Result<()>`
#[macro_export]
macro_rules! routes {
    ($($method:ident $path:literal => $handler:expr),* $(,)?) => {
        vec![
            $(
                $crate::routes!(@route $method, $path, $handler)
            ),*
        ]
    };

    (@route $method:ident, $path:expr, $handler:expr) => {
        $crate::routing::Route::new(
            $crate::hyper::Method::$method,
            $path,
            $crate::routing::handler_fn(|ctx| Box::pin($handler(ctx))),
        )
    };
}
