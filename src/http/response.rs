use crate::error::Result;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

/// Standard JSON body used by the `json_*` helpers on
/// [`Context`](crate::Context): `{"status": .., "data": .., "message": ..}`.
/// Empty `data` and `message` are left out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T = serde_json::Value> {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn new(status: u16, data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            status,
            data,
            message: message.into(),
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Envelope without a data payload
    pub fn message(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, None, message)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(b"Not Found".to_vec())
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(b"Internal Server Error".to_vec())
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::FOUND).with_header("Location", location)
    }

    pub fn json<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        let body = serde_json::to_vec(data)?;
        Ok(Self::ok()
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    pub fn html(content: impl Into<String>) -> Self {
        Self::ok()
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(content.into().into_bytes())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::ok()
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(content.into().into_bytes())
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Append a header, keeping any existing value with the same name
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Replace every existing value of `name` with `value`
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.add_header(name, value);
    }

    /// First value of a response header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Take status, body and content type from `replacement` while keeping
    /// the other headers already set, such as CORS or request id headers
    pub fn replace_content(&mut self, replacement: Response) {
        self.status = replacement.status;
        self.body = replacement.body;
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        for (name, value) in replacement.headers {
            self.set_header(&name, &value);
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn body_size(&self) -> usize {
        self.body.len()
    }

    pub fn into_hyper(self) -> hyper::Response<hyper::Body> {
        let mut builder = hyper::Response::builder().status(self.status);

        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        builder
            .body(hyper::Body::from(self.body))
            .unwrap_or_else(|e| {
                log::error!("Failed to build response: {}", e);
                let mut fallback = hyper::Response::new(hyper::Body::empty());
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
