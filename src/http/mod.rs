pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use params::{parse_bool, RawParam};
pub use request::Request;
pub use response::{Envelope, Response};
pub use server::{Server, DEFAULT_SHUTDOWN_TIMEOUT};
