use super::{join_paths, Handler, Route, Router};
use crate::error::Result;
use crate::middleware::Middleware;
use hyper::Method;
use std::sync::Arc;

/// Registration scope that shares a path prefix and a middleware list
///
/// A group borrows the router mutably, so it only exists during
/// registration. Middleware added to a group applies to routes registered
/// on it afterwards, and to groups nested from it afterwards.
///
/// ```rust,ignore
/// let mut api = router.group("/api");
/// api.use_middleware(RequestId::new());
/// api.get("/health", health)?;
///
/// let mut admin = api.group("/admin");
/// admin.use_middleware(require_admin);
/// admin.delete("/users/:id", delete_user)?; // DELETE /api/admin/users/:id
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str) -> Self {
        Self {
            router,
            prefix: join_paths(prefix, ""),
            middleware: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Nested group; inherits this group's prefix and its middleware as of now
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            prefix: join_paths(&self.prefix, prefix),
            middleware: self.middleware.clone(),
            router: &mut *self.router,
        }
    }

    /// Register `route` under this group's prefix, with the group's
    /// middleware placed outside the route's own
    pub fn add_route(&mut self, mut route: Route) -> Result<()> {
        route.path = join_paths(&self.prefix, &route.path);
        route.middleware = self
            .middleware
            .iter()
            .cloned()
            .chain(route.middleware)
            .collect();
        self.router.add_route(route)
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
}

impl std::fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
