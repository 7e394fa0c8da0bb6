//! Request logging middleware
//!
//! Logs one line per request once the inner chain has returned: method,
//! path, response status, elapsed time and the request id when one was
//! assigned. When the `info` level is disabled the middleware only forwards.

use crate::context::Context;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::routing::{BoxedHandler, Handler};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// HTTP request logging middleware
///
/// Place it first so the logged status reflects every other middleware:
///
/// ```rust,ignore
/// router.use_middleware(Logging::new());
/// router.use_middleware(Recovery::new());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Logging;

impl Logging {
    pub fn new() -> Self {
        Self
    }
}

struct LoggingHandler {
    next: BoxedHandler,
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        if !log::log_enabled!(log::Level::Info) {
            return self.next.call(ctx).await;
        }

        let start = Instant::now();
        let result = self.next.call(ctx).await;
        let elapsed = start.elapsed();

        // An Err here is turned into a response by the router afterwards
        let status = match &result {
            Ok(()) => ctx.res.status.as_u16(),
            Err(err) => err.status_code(),
        };

        match ctx.request_id() {
            Some(id) => log::info!(
                "{} {} {} in {:?} [{}]",
                ctx.req.method,
                ctx.req.path(),
                status,
                elapsed,
                id
            ),
            None => log::info!(
                "{} {} {} in {:?}",
                ctx.req.method,
                ctx.req.path(),
                status,
                elapsed
            ),
        }

        result
    }
}

impl Middleware for Logging {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(LoggingHandler { next })
    }

    fn name(&self) -> &str {
        "logging"
    }
}
