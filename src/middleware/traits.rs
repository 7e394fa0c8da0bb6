//! The middleware contract
//!
//! A middleware receives the next handler in the chain and returns a
//! replacement handler. The replacement may run code before and after
//! calling `next`, or skip `next` entirely to short-circuit the request.

use crate::routing::BoxedHandler;
use std::fmt;

/// Wraps a handler with extra behaviour
///
/// # Example
///
/// ```rust,ignore
/// use nex::prelude::*;
///
/// struct Timing;
///
/// struct TimingHandler {
///     next: BoxedHandler,
/// }
///
/// #[async_trait]
/// impl Handler for TimingHandler {
///     async fn call(&self, ctx: &mut Context) -> Result<()> {
///         let start = std::time::Instant::now();
///         let result = self.next.call(ctx).await;
///         ctx.set_header("X-Response-Time", &format!("{}ms", start.elapsed().as_millis()));
///         result
///     }
/// }
///
/// impl Middleware for Timing {
///     fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
///         Arc::new(TimingHandler { next })
///     }
///
///     fn name(&self) -> &str {
///         "timing"
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Return a handler that runs this middleware around `next`
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;

    /// Name used in route listings and debug logs
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Middleware built from a plain `Fn(next) -> handler` closure
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (self.f)(next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish()
    }
}

/// Create a named middleware from a closure
///
/// ```rust,ignore
/// let auth = middleware_fn("auth", |next| {
///     Arc::new(handler_fn(move |ctx| {
///         let next = next.clone();
///         Box::pin(async move {
///             if ctx.header("authorization").is_none() {
///                 return ctx.json_unauthorized("missing credentials");
///             }
///             next.call(ctx).await
///         })
///     }))
/// });
/// ```
pub fn middleware_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}
