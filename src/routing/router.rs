use super::group::Group;
use super::matcher::RegexCache;
use super::trie::{ParamPriority, RouteDescription, Tree};
use super::{normalize_path, BoxedHandler, Handler, Params, Route};
use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Request, Response, Server};
use crate::middleware::{compose, Middleware, MiddlewareStack};
use futures::FutureExt;
use hyper::{Method, StatusCode};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Called with the context and the error when a handler chain returns `Err`
pub type ErrorHandler = Arc<dyn Fn(&mut Context, Error) + Send + Sync>;

/// Result of a successful [`Router::lookup`]
pub struct RouteMatch {
    pub handler: BoxedHandler,
    pub params: Params,
    /// Router middleware followed by group and route middleware, outermost first
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub pattern: String,
}

impl RouteMatch {
    /// The handler wrapped in its full middleware chain
    pub fn composed(&self) -> BoxedHandler {
        compose(self.handler.clone(), &self.middleware)
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Route registry and request dispatcher
///
/// Routes are registered through `&mut self`. Serving moves the router into
/// an `Arc`, after which it is read-only and shared by every connection.
pub struct Router {
    tree: Tree,
    middleware: MiddlewareStack,
    not_found: Option<BoxedHandler>,
    error_handler: Option<ErrorHandler>,
    print_routes: bool,
    print_middleware: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::from_parts(Tree::new())
    }

    /// Router configured from the `[router]` config section
    pub fn with_config(config: &RouterConfig) -> Self {
        let mut router = Self::from_parts(Tree::with_cache(
            Arc::new(RegexCache::new()),
            config.param_priority,
        ));
        router.print_routes = config.print_routes;
        router.print_middleware = config.print_middleware;
        router
    }

    /// Router that compiles constraints through an existing cache
    pub fn with_regex_cache(cache: Arc<RegexCache>) -> Self {
        Self::from_parts(Tree::with_cache(cache, ParamPriority::default()))
    }

    /// Router with an explicit parameter-sibling policy
    pub fn with_priority(priority: ParamPriority) -> Self {
        Self::from_parts(Tree::with_cache(Arc::new(RegexCache::new()), priority))
    }

    fn from_parts(tree: Tree) -> Self {
        Self {
            tree,
            middleware: MiddlewareStack::new(),
            not_found: None,
            error_handler: None,
            print_routes: false,
            print_middleware: false,
        }
    }

    /// Append router-level middleware. It wraps every route, including
    /// routes registered before this call.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push_shared(middleware);
        self
    }

    /// Register a route. Fails on a duplicate `(method, path)`, a malformed
    /// parameter segment or an invalid regex constraint.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let pattern = normalize_path(&route.path);
        self.tree
            .insert(route.method, &pattern, route.handler, route.middleware)
    }

    pub fn add_routes(&mut self, routes: Vec<Route>) -> Result<()> {
        for route in routes {
            self.add_route(route)?;
        }
        Ok(())
    }

    pub fn route<H: Handler>(&mut self, method: Method, path: &str, handler: H) -> Result<()> {
        self.add_route(Route::new(method, path, handler))
    }

    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> Result<()> {
        self.route(Method::GET, path, handler)
    }

    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> Result<()> {
        self.route(Method::POST, path, handler)
    }

    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> Result<()> {
        self.route(Method::PUT, path, handler)
    }

    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> Result<()> {
        self.route(Method::DELETE, path, handler)
    }

    pub fn patch<H: Handler>(&mut self, path: &str, handler: H) -> Result<()> {
        self.route(Method::PATCH, path, handler)
    }

    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix)
    }

    /// Handler used when no route matches; defaults to a plain 404
    pub fn set_not_found<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn set_error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, Error) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn set_print_routes(&mut self, print: bool) -> &mut Self {
        self.print_routes = print;
        self
    }

    pub fn set_print_middleware(&mut self, print: bool) -> &mut Self {
        if !self.print_routes {
            log::warn!("Middleware listing has no effect unless route printing is enabled");
        }
        self.print_middleware = print;
        self
    }

    /// Find the route for `method` and `path` without running it
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let (endpoint, params) = self.tree.find(method, path)?;
        Some(RouteMatch {
            handler: endpoint.handler.clone(),
            params,
            middleware: self.middleware.chained(&endpoint.middleware),
            pattern: endpoint.pattern.clone(),
        })
    }

    /// Dispatch one request through the matching route's middleware chain
    ///
    /// Never fails: a missing route becomes a 404, a handler error goes
    /// through the error handler, and a panic becomes a 500. Router
    /// middleware also wraps the not-found handler, so CORS preflights and
    /// request logging cover unmatched paths.
    pub async fn handle(&self, request: Request) -> Response {
        let (mut ctx, handler, label) = match self.lookup(&request.method, request.path()) {
            Some(matched) => {
                let handler = matched.composed();
                let mut ctx = Context::new(request);
                ctx.set_params(matched.params);
                (ctx, handler, matched.pattern)
            }
            None => {
                log::debug!("No route for {} {}", request.method, request.path());
                let label = request.path().to_string();
                let mut ctx = Context::new(request);
                ctx.res = Response::not_found();
                (ctx, self.not_found_handler(), label)
            }
        };

        let outcome = AssertUnwindSafe(handler.call(&mut ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.handle_error(&mut ctx, err),
            Err(panic) => {
                log::error!(
                    "Handler for {} {} panicked: {}",
                    ctx.req.method,
                    label,
                    panic_message(panic.as_ref())
                );
                ctx.res.replace_content(Response::internal_error());
            }
        }

        ctx.into_response()
    }

    fn not_found_handler(&self) -> BoxedHandler {
        let inner: BoxedHandler = match &self.not_found {
            Some(handler) => handler.clone(),
            None => Arc::new(super::handler_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.res.replace_content(Response::not_found());
                    Ok(())
                })
            })),
        };
        compose(inner, self.middleware.as_slice())
    }

    fn handle_error(&self, ctx: &mut Context, err: Error) {
        let status = err.status_code();
        if status >= 500 {
            log::error!("{} {} failed: {}", ctx.req.method, ctx.req.path(), err);
        } else {
            log::warn!("{} {} rejected: {}", ctx.req.method, ctx.req.path(), err);
        }

        match &self.error_handler {
            Some(handler) => handler(ctx, err),
            None => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                ctx.res
                    .replace_content(Response::text(err.to_string()).with_status(status));
            }
        }
    }

    /// Every registered route with its effective middleware names
    pub fn routes(&self) -> Vec<RouteDescription> {
        let global = self.middleware.names();
        self.tree
            .routes()
            .into_iter()
            .map(|mut route| {
                route.middleware = global
                    .iter()
                    .map(|name| name.to_string())
                    .chain(route.middleware)
                    .collect();
                route
            })
            .collect()
    }

    /// Log the route table if route printing is enabled
    pub fn log_routes(&self) {
        if !self.print_routes {
            return;
        }

        log::info!("Registered {} route(s)", self.route_count());
        for route in self.routes() {
            if self.print_middleware && !route.middleware.is_empty() {
                log::info!(
                    "  {:<7} {} [{}]",
                    route.method.as_str(),
                    route.pattern,
                    route.middleware.join(", ")
                );
            } else {
                log::info!("  {:<7} {}", route.method.as_str(), route.pattern);
            }
        }
    }

    pub fn route_count(&self) -> usize {
        self.tree.route_count()
    }

    pub fn is_empty(&self) -> bool {
        self.route_count() == 0
    }

    pub fn regex_cache(&self) -> &Arc<RegexCache> {
        self.tree.regex_cache()
    }

    /// Serve on `addr` until SIGINT/SIGTERM, then drain in-flight requests
    pub async fn run(self, addr: &str) -> Result<()> {
        Server::new(self).serve(addr).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_count())
            .field("middleware", &self.middleware)
            .field("priority", &self.tree.priority())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
