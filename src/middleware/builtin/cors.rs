//! CORS (Cross-Origin Resource Sharing) middleware
//!
//! Adds the CORS headers when the request's `Origin` is allowed, and answers
//! `OPTIONS` preflight requests with 200 without calling the rest of the chain.

use crate::context::Context;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::routing::{BoxedHandler, Handler};
use async_trait::async_trait;
use hyper::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// CORS middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any origin
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Origin", "Content-Type", "Accept", "Authorization"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allow_credentials: false,
            max_age: None,
        }
    }
}

impl CorsConfig {
    fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allow_origins.iter().any(|o| o == "*" || o == origin)
    }
}

/// CORS middleware
#[derive(Debug, Clone, Default)]
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    /// CORS middleware with the default, permissive configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CorsConfig) -> Self {
        Self { config }.checked()
    }

    pub fn allow_origins(mut self, origins: &[&str]) -> Self {
        self.config.allow_origins = origins.iter().map(|s| s.to_string()).collect();
        self.checked()
    }

    pub fn allow_methods(mut self, methods: &[&str]) -> Self {
        self.config.allow_methods = methods.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn allow_headers(mut self, headers: &[&str]) -> Self {
        self.config.allow_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self.checked()
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.config.max_age = Some(seconds);
        self
    }

    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    fn checked(self) -> Self {
        if self.config.allow_credentials && self.config.allow_origins.iter().any(|o| o == "*") {
            log::warn!(
                "CORS: credentials are allowed together with a wildcard origin; \
                 the request origin will be echoed for every caller"
            );
        }
        self
    }
}

struct CorsHandler {
    config: Arc<CorsConfig>,
    next: BoxedHandler,
}

impl CorsHandler {
    fn apply_headers(&self, ctx: &mut Context) {
        let Some(origin) = ctx.header("origin").map(str::to_string) else {
            return;
        };
        if !self.config.is_origin_allowed(&origin) {
            log::debug!("CORS: origin '{}' not allowed", origin);
            return;
        }

        ctx.set_header("Access-Control-Allow-Origin", &origin);
        ctx.add_header("Vary", "Origin");
        if !self.config.allow_methods.is_empty() {
            ctx.set_header(
                "Access-Control-Allow-Methods",
                &self.config.allow_methods.join(","),
            );
        }
        if !self.config.allow_headers.is_empty() {
            ctx.set_header(
                "Access-Control-Allow-Headers",
                &self.config.allow_headers.join(","),
            );
        }
        if self.config.allow_credentials {
            ctx.set_header("Access-Control-Allow-Credentials", "true");
        }
        if let Some(max_age) = self.config.max_age {
            ctx.set_header("Access-Control-Max-Age", &max_age.to_string());
        }
    }
}

#[async_trait]
impl Handler for CorsHandler {
    async fn call(&self, ctx: &mut Context) -> Result<()> {
        self.apply_headers(ctx);

        if ctx.req.method == Method::OPTIONS {
            log::debug!("Answering CORS preflight for {}", ctx.req.path());
            ctx.status(StatusCode::OK);
            ctx.res.body.clear();
            return Ok(());
        }

        self.next.call(ctx).await
    }
}

impl Middleware for Cors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CorsHandler {
            config: Arc::new(self.config.clone()),
            next,
        })
    }

    fn name(&self) -> &str {
        "cors"
    }
}
