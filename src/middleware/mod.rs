//! nex middleware system
//!
//! Middleware are values with a single `wrap` capability. A chain is an
//! ordered list of them, and composing a chain is a right fold: the first
//! middleware in the list ends up outermost and the handler innermost.
//!
//! At dispatch the effective chain is router-level middleware, then group
//! middleware from the outermost group inwards, then the route's own
//! middleware.

pub mod builtin;
pub mod traits;

use crate::routing::BoxedHandler;
use std::sync::Arc;

pub use traits::{middleware_fn, FnMiddleware, Middleware};

/// Wrap `handler` in `chain`, first element outermost
pub fn compose(handler: BoxedHandler, chain: &[Arc<dyn Middleware>]) -> BoxedHandler {
    chain
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

/// Ordered collection of middleware attached at one level (router or group)
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs inside everything pushed before it
    pub fn push<M: Middleware>(&mut self, middleware: M) {
        self.middleware.push(Arc::new(middleware));
    }

    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    /// This stack followed by `inner`
    pub fn chained(&self, inner: &[Arc<dyn Middleware>]) -> Vec<Arc<dyn Middleware>> {
        self.middleware.iter().chain(inner).cloned().collect()
    }

    pub fn as_slice(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::http::Request;
    use crate::routing::{handler_fn, Handler};
    use hyper::Method;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn tracer(label: &'static str, trace: Trace) -> impl Middleware {
        middleware_fn(label, move |next: BoxedHandler| {
            let trace = trace.clone();
            Arc::new(handler_fn(move |ctx: &mut Context| {
                let next = next.clone();
                let trace = trace.clone();
                Box::pin(async move {
                    trace.lock().unwrap().push(format!("{}-enter", label));
                    let result = next.call(ctx).await;
                    trace.lock().unwrap().push(format!("{}-exit", label));
                    result
                })
            })) as BoxedHandler
        })
    }

    fn terminal(trace: Trace) -> BoxedHandler {
        Arc::new(handler_fn(move |ctx: &mut Context| {
            let trace = trace.clone();
            Box::pin(async move {
                trace.lock().unwrap().push("H".to_string());
                ctx.text(200, "done")
            })
        }))
    }

    #[tokio::test]
    async fn test_compose_order() {
        let trace: Trace = Arc::default();
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(tracer("A", trace.clone())),
            Arc::new(tracer("B", trace.clone())),
        ];

        let handler = compose(terminal(trace.clone()), &chain);
        let mut ctx = Context::new(Request::new(Method::GET, "/"));
        handler.call(&mut ctx).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["A-enter", "B-enter", "H", "B-exit", "A-exit"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_chain() {
        let trace: Trace = Arc::default();
        let gate = middleware_fn("gate", |_next: BoxedHandler| {
            Arc::new(handler_fn(|ctx: &mut Context| {
                Box::pin(async move { ctx.text(403, "denied") })
            })) as BoxedHandler
        });
        let chain: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(tracer("A", trace.clone())), Arc::new(gate)];

        let handler = compose(terminal(trace.clone()), &chain);
        let mut ctx = Context::new(Request::new(Method::GET, "/"));
        handler.call(&mut ctx).await.unwrap();

        assert_eq!(ctx.res.status.as_u16(), 403);
        assert_eq!(*trace.lock().unwrap(), vec!["A-enter", "A-exit"]);
    }

    #[test]
    fn test_stack_chaining() {
        let trace: Trace = Arc::default();
        let mut outer = MiddlewareStack::new();
        outer.push(tracer("A", trace.clone()));
        let inner: Vec<Arc<dyn Middleware>> = vec![Arc::new(tracer("B", trace))];

        let chain = outer.chained(&inner);
        let names: Vec<&str> = chain.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(outer.len(), 1);
    }
}
