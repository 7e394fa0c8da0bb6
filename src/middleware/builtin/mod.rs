//! Built-in middleware implementations
//!
//! Common middleware most services want. They also serve as examples of
//! the `Middleware` contract for third-party authors.

pub mod content_type;
pub mod cors;
pub mod logging;
pub mod recovery;
pub mod request_id;

pub use content_type::ContentType;
pub use cors::{Cors, CorsConfig};
pub use logging::Logging;
pub use recovery::Recovery;
pub use request_id::{RequestId, REQUEST_ID_HEADER};
