use crate::context::{Context, REQUEST_ID_KEY};
use crate::error::Result;
use crate::middleware::Middleware;
use crate::routing::{BoxedHandler, Handler};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Assigns every request an id
///
/// An incoming `X-Request-ID` header is reused, otherwise a v4 UUID is
/// generated. The id is stored in the context (see
/// [`Context::request_id`]) and echoed back in the response header.
#[derive(Debug, Clone)]
pub struct RequestId {
    header: String,
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestId {
    pub fn new() -> Self {
        Self {
            header: REQUEST_ID_HEADER.to_string(),
        }
    }

    /// Read and echo a different header name
    pub fn with_header(header: &str) -> Self {
        Self {
            header: header.to_string(),
        }
    }
}

struct RequestIdHandler {
    header: Arc<str>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RequestIdHandler {
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        let id = match ctx.header(&self.header) {
            Some(existing) if !existing.is_empty() => existing.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        ctx.set_header(&self.header, &id);
        ctx.set(REQUEST_ID_KEY, id);
        self.next.call(ctx).await
    }
}

impl Middleware for RequestId {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequestIdHandler {
            header: Arc::from(self.header.as_str()),
            next,
        })
    }

    fn name(&self) -> &str {
        "request_id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::routing::handler_fn;
    use hyper::Method;

    fn echo_id() -> BoxedHandler {
        Arc::new(handler_fn(|ctx: &mut Context| {
            Box::pin(async move {
                let id = ctx.request_id().unwrap_or_default().to_string();
                ctx.text(200, id)
            })
        }))
    }

    #[tokio::test]
    async fn test_generates_id() {
        let handler = RequestId::new().wrap(echo_id());
        let mut ctx = Context::new(Request::new(Method::GET, "/"));
        handler.call(&mut ctx).await.unwrap();

        let header = ctx.response_header("x-request-id").unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(ctx.res.body, header.as_bytes());
    }

    #[tokio::test]
    async fn test_reuses_incoming_id() {
        let handler = RequestId::new().wrap(echo_id());
        let mut ctx = Context::new(
            Request::new(Method::GET, "/").with_header("X-Request-ID", "upstream-7"),
        );
        handler.call(&mut ctx).await.unwrap();

        assert_eq!(ctx.response_header("X-Request-ID"), Some("upstream-7"));
        assert_eq!(ctx.request_id(), Some("upstream-7"));
    }

    #[tokio::test]
    async fn test_custom_header() {
        let handler = RequestId::with_header("X-Correlation-ID").wrap(echo_id());
        let mut ctx = Context::new(
            Request::new(Method::GET, "/").with_header("x-correlation-id", "c-1"),
        );
        handler.call(&mut ctx).await.unwrap();

        assert_eq!(ctx.response_header("X-Correlation-ID"), Some("c-1"));
        assert!(ctx.response_header("X-Request-ID").is_none());
    }
}
