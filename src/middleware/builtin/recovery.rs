use crate::context::Context;
use crate::error::Result;
use crate::http::Response;
use crate::middleware::Middleware;
use crate::routing::{BoxedHandler, Handler};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Turns a panic in the inner chain into a logged 500 response
///
/// The router already guards every dispatch the same way; installing
/// `Recovery` inside the chain lets outer middleware (logging, request id)
/// see the 500 instead of being unwound past.
#[derive(Debug, Clone, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

struct RecoveryHandler {
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RecoveryHandler {
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        let outcome = AssertUnwindSafe(self.next.call(ctx)).catch_unwind().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&'static str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(|s| s.as_str()))
                    .unwrap_or("non-string panic payload");
                log::error!(
                    "Recovered from panic in {} {}: {}",
                    ctx.req.method,
                    ctx.req.path(),
                    message
                );

                ctx.res.replace_content(Response::internal_error());
                Ok(())
            }
        }
    }
}

impl Middleware for Recovery {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RecoveryHandler { next })
    }

    fn name(&self) -> &str {
        "recovery"
    }
}
