//! Nex - a small HTTP routing framework
//!
//! Nex provides:
//! - A method-aware radix tree router with named, regex-constrained and
//!   wildcard parameters
//! - Route groups and composable middleware at router, group and route level
//! - A request context with typed parameter access and JSON envelope helpers
//! - A hyper server with graceful shutdown and TOML configuration

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routing;

// Re-export main types for public API
pub use config::{AppConfig, RouterConfig, ServerConfig};
pub use context::Context;
pub use error::{Error, ParamError, ParamSource, Result};
pub use http::{Envelope, Request, Response, Server};
pub use middleware::{middleware_fn, Middleware, MiddlewareStack};
pub use routing::{
    handler_fn, BoxedHandler, Group, Handler, ParamPriority, Params, Route, RouteMatch, Router,
};

// Used by the `routes!` macro
pub use hyper;

// Re-export commonly used external types
pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::middleware::builtin::{
        ContentType, Cors, CorsConfig, Logging, Recovery, RequestId,
    };
    pub use crate::routes;
    pub use crate::{
        handler_fn, middleware_fn, AppConfig, BoxedHandler, Context, Envelope, Error, Handler,
        Middleware, Request, Response, Result, Route, Router, Server,
    };
    pub use async_trait::async_trait;
    pub use hyper::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::json;
    pub use std::sync::Arc;
}
