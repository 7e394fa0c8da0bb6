use crate::context::Context;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::routing::{BoxedHandler, Handler};
use async_trait::async_trait;
use std::sync::Arc;

/// Rejects requests whose `Content-Type` is not the expected media type
///
/// Only the media type is compared, case-insensitively, so
/// `application/json; charset=utf-8` satisfies `application/json`. A missing
/// or different header ends the chain with `415 Invalid Content-Type`.
#[derive(Debug, Clone)]
pub struct ContentType {
    expected: String,
}

impl ContentType {
    pub fn new(expected: &str) -> Self {
        Self {
            expected: media_type(expected).to_ascii_lowercase(),
        }
    }

    pub fn json() -> Self {
        Self::new("application/json")
    }

    pub fn form() -> Self {
        Self::new("application/x-www-form-urlencoded")
    }
}

fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}

struct ContentTypeHandler {
    expected: Arc<str>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for ContentTypeHandler {
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        let matches = ctx
            .header("content-type")
            .map(|value| media_type(value).eq_ignore_ascii_case(&self.expected))
            .unwrap_or(false);

        if !matches {
            log::debug!(
                "Rejected {} {}: expected content type {}",
                ctx.method(),
                ctx.path(),
                self.expected
            );
            return ctx.text(415, "Invalid Content-Type");
        }

        self.next.call(ctx).await
    }
}

impl Middleware for ContentType {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(ContentTypeHandler {
            expected: Arc::from(self.expected.as_str()),
            next,
        })
    }

    fn name(&self) -> &str {
        "content_type"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::routing::handler_fn;
    use hyper::{Method, StatusCode};

    fn accepted() -> BoxedHandler {
        Arc::new(handler_fn(|ctx: &mut Context| {
            Box::pin(async move { ctx.text(200, "accepted") })
        }))
    }

    async fn send(middleware: &ContentType, content_type: Option<&str>) -> Context {
        let mut request = Request::new(Method::POST, "/items");
        if let Some(value) = content_type {
            request = request.with_header("Content-Type", value);
        }
        let mut ctx = Context::new(request);
        middleware.wrap(accepted()).call(&mut ctx).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_matching_media_type_passes() {
        let json = ContentType::json();
        for value in ["application/json", "Application/JSON", "application/json; charset=utf-8"] {
            let ctx = send(&json, Some(value)).await;
            assert_eq!(ctx.res.status, StatusCode::OK, "{}", value);
            assert_eq!(ctx.res.body, b"accepted");
        }
    }

    #[tokio::test]
    async fn test_mismatch_is_unsupported_media_type() {
        let json = ContentType::json();
        for value in [Some("text/plain"), Some("application/jsonp"), None] {
            let ctx = send(&json, value).await;
            assert_eq!(ctx.res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{:?}", value);
            assert_eq!(ctx.res.body, b"Invalid Content-Type");
        }
    }

    #[tokio::test]
    async fn test_rejection_keeps_outer_headers() {
        let mut ctx = Context::new(Request::new(Method::POST, "/"));
        ctx.set_header("X-Request-ID", "r-9");
        ContentType::form()
            .wrap(accepted())
            .call(&mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(ctx.response_header("x-request-id"), Some("r-9"));
    }
}
