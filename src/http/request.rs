use crate::error::{Error, Result};
use hyper::{Body, Method, Request as HyperRequest};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Buffered incoming request
///
/// Header names are stored lowercased. Query values are percent-decoded and
/// every occurrence of a repeated key is kept in order. A trailing `[]` on a
/// key is dropped, so `tag[]=a&tag[]=b` and `tag=a&tag=b` read the same.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, Vec<String>>,
    body_bytes: Vec<u8>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, "/")
    }
}

impl Request {
    /// Build a request by hand, mostly useful for tests and for calling
    /// [`Router::handle`](crate::Router::handle) directly
    pub fn new(method: Method, uri: &str) -> Self {
        let query = match uri.split_once('?') {
            Some((_, query)) => Self::parse_query(query),
            None => HashMap::new(),
        };

        Request {
            method,
            uri: uri.to_string(),
            headers: HashMap::new(),
            query,
            body_bytes: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body_bytes = body.into();
        self
    }

    /// Read the whole body of a hyper request into memory
    pub async fn from_hyper(req: HyperRequest<Body>) -> Result<Self> {
        let method = req.method().clone();
        let uri = req.uri().to_string();

        let mut headers = HashMap::new();
        for (name, value) in req.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(name.as_str().to_string(), value_str.to_string());
            }
        }

        let query = Self::parse_query(req.uri().query().unwrap_or(""));
        let body_bytes = hyper::body::to_bytes(req.into_body()).await?.to_vec();

        Ok(Request {
            method,
            uri,
            headers,
            query,
            body_bytes,
        })
    }

    /// Request path without scheme, host or query string
    pub fn path(&self) -> &str {
        let without_query = match self.uri.find('?') {
            Some(query_start) => &self.uri[..query_start],
            None => &self.uri,
        };

        match without_query.find("://") {
            Some(scheme_end) => {
                let after_scheme = &without_query[scheme_end + 3..];
                match after_scheme.find('/') {
                    Some(path_start) => &after_scheme[path_start..],
                    None => "/",
                }
            }
            None => without_query,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// First value of a query key
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    /// Every value of a query key, in request order
    pub fn query_values(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// Client address from `X-Forwarded-For` or `X-Real-IP`, if present
    pub fn client_ip(&self) -> Option<&str> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first_ip) = forwarded.split(',').next() {
                return Some(first_ip.trim());
            }
        }
        self.header("x-real-ip")
    }

    pub fn body(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body_bytes).map_err(Error::Json)
    }

    pub fn body_xml<T: DeserializeOwned>(&self) -> Result<T> {
        let text = std::str::from_utf8(&self.body_bytes)
            .map_err(|e| Error::invalid_input(format!("XML body is not UTF-8: {}", e)))?;
        quick_xml::de::from_str(text).map_err(Error::Xml)
    }

    /// Decode an `application/x-www-form-urlencoded` body
    pub fn body_form(&self) -> HashMap<String, Vec<String>> {
        Self::parse_query(&String::from_utf8_lossy(&self.body_bytes))
    }

    pub(crate) fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let mut key = Self::decode_component(key);
            if let Some(stripped) = key.strip_suffix("[]") {
                key = stripped.to_string();
            }
            if key.is_empty() {
                continue;
            }
            result
                .entry(key)
                .or_default()
                .push(Self::decode_component(value));
        }
        result
    }

    fn decode_component(raw: &str) -> String {
        let spaced = raw.replace('+', " ");
        match urlencoding::decode(&spaced) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => spaced,
        }
    }
}
