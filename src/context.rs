use crate::error::{Error, ParamError, ParamSource, Result};
use crate::http::{Envelope, RawParam, Request, Response};
use crate::routing::Params;
use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use uuid::Uuid;

/// Key under which [`RequestId`](crate::middleware::builtin::RequestId) stores the id
pub const REQUEST_ID_KEY: &str = "request_id";

/// Per-request state handed to handlers and middleware
///
/// A context is created by the router for every request, is owned by that
/// request's task, and is dropped once the middleware chain returns.
pub struct Context {
    pub req: Request,
    pub res: Response,
    params: Params,
    /// Storage for middleware data
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
    /// Cached form body to avoid re-parsing
    cached_form: Option<HashMap<String, Vec<String>>>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            req: request,
            res: Response::ok(),
            params: Params::new(),
            data: HashMap::new(),
            cached_form: None,
        }
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Consume the context, keeping only the response
    pub fn into_response(self) -> Response {
        self.res
    }

    pub fn method(&self) -> &Method {
        &self.req.method
    }

    pub fn path(&self) -> &str {
        self.req.path()
    }

    // Middleware data storage

    /// Store a value for later middleware or the handler
    pub fn set<T: Any + Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.data.insert(key.to_string(), Box::new(value));
    }

    /// Retrieve a stored value; `None` if absent or of another type
    pub fn get<T: Any + Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.data
            .get(key)
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove_data(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// Id assigned by the request id middleware, if it ran
    pub fn request_id(&self) -> Option<&str> {
        self.get::<String>(REQUEST_ID_KEY).map(|s| s.as_str())
    }

    // Path parameters

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Raw path parameter; wildcard segments are under `"*"`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    fn path_param<'a>(&'a self, name: &'a str) -> RawParam<'a> {
        RawParam::new(ParamSource::Path, name, self.params.get(name))
    }

    pub fn str_param(&self, name: &str) -> std::result::Result<String, ParamError> {
        self.path_param(name).as_str()
    }

    pub fn int_param(&self, name: &str) -> std::result::Result<i64, ParamError> {
        self.path_param(name).as_int()
    }

    pub fn bool_param(&self, name: &str) -> std::result::Result<bool, ParamError> {
        self.path_param(name).as_bool()
    }

    pub fn float_param(&self, name: &str) -> std::result::Result<f64, ParamError> {
        self.path_param(name).as_float()
    }

    pub fn uuid_param(&self, name: &str) -> std::result::Result<Uuid, ParamError> {
        self.path_param(name).as_uuid()
    }

    pub fn str_param_or(&self, name: &str, default: &str) -> String {
        self.str_param(name)
            .unwrap_or_else(|_| default.to_string())
    }

    pub fn int_param_or(&self, name: &str, default: i64) -> i64 {
        self.int_param(name).unwrap_or(default)
    }

    // Query parameters

    /// First value of a query key
    pub fn query(&self, name: &str) -> Option<&str> {
        self.req.query_value(name)
    }

    /// Every value of a repeated query key, in request order
    pub fn query_all(&self, name: &str) -> &[String] {
        self.req.query_values(name)
    }

    fn query_param<'a>(&'a self, name: &'a str) -> RawParam<'a> {
        RawParam::new(ParamSource::Query, name, self.req.query_value(name))
    }

    pub fn str_query(&self, name: &str) -> std::result::Result<String, ParamError> {
        self.query_param(name).as_str()
    }

    pub fn int_query(&self, name: &str) -> std::result::Result<i64, ParamError> {
        self.query_param(name).as_int()
    }

    pub fn float_query(&self, name: &str) -> std::result::Result<f64, ParamError> {
        self.query_param(name).as_float()
    }

    pub fn bool_query(&self, name: &str) -> std::result::Result<bool, ParamError> {
        self.query_param(name).as_bool()
    }

    pub fn uuid_query(&self, name: &str) -> std::result::Result<Uuid, ParamError> {
        self.query_param(name).as_uuid()
    }

    pub fn str_query_or(&self, name: &str, default: &str) -> String {
        self.str_query(name)
            .unwrap_or_else(|_| default.to_string())
    }

    pub fn int_query_or(&self, name: &str, default: i64) -> i64 {
        self.int_query(name).unwrap_or(default)
    }

    pub fn bool_query_or(&self, name: &str, default: bool) -> bool {
        self.bool_query(name).unwrap_or(default)
    }

    // Body

    pub fn raw_body(&self) -> &[u8] {
        self.req.body()
    }

    pub fn body_string(&self) -> String {
        self.req.body_string()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T> {
        self.req.body_json()
    }

    pub fn body_xml<T: DeserializeOwned>(&self) -> Result<T> {
        self.req.body_xml()
    }

    /// Form-encoded body fields (parsed once per request)
    pub fn body_form(&mut self) -> &HashMap<String, Vec<String>> {
        let req = &self.req;
        self.cached_form.get_or_insert_with(|| req.body_form())
    }

    /// First value of a form field
    pub fn form_value(&mut self, name: &str) -> Option<&str> {
        self.body_form()
            .get(name)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    /// Every value of a repeated form field, in body order
    pub fn form_values(&mut self, name: &str) -> &[String] {
        self.body_form()
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if the field is present in the form body, even with an empty value
    pub fn has_form_field(&mut self, name: &str) -> bool {
        self.body_form().contains_key(name)
    }

    fn form_param(&mut self, name: &str) -> Option<String> {
        self.form_value(name).map(str::to_string)
    }

    pub fn str_form(&mut self, name: &str) -> std::result::Result<String, ParamError> {
        let value = self.form_param(name);
        RawParam::new(ParamSource::Form, name, value.as_deref()).as_str()
    }

    pub fn int_form(&mut self, name: &str) -> std::result::Result<i64, ParamError> {
        let value = self.form_param(name);
        RawParam::new(ParamSource::Form, name, value.as_deref()).as_int()
    }

    pub fn float_form(&mut self, name: &str) -> std::result::Result<f64, ParamError> {
        let value = self.form_param(name);
        RawParam::new(ParamSource::Form, name, value.as_deref()).as_float()
    }

    pub fn bool_form(&mut self, name: &str) -> std::result::Result<bool, ParamError> {
        let value = self.form_param(name);
        RawParam::new(ParamSource::Form, name, value.as_deref()).as_bool()
    }

    /// Deserialize the form body into `T`
    ///
    /// Values that look like integers, floats or `true`/`false` are coerced
    /// first and a repeated field becomes an array. If `T` rejects the coerced
    /// shape, the fields are retried as plain strings.
    pub fn bind_form<T: DeserializeOwned>(&mut self) -> Result<T> {
        let form = self.body_form();
        match serde_json::from_value(form_to_json(form, coerce_form_value)) {
            Ok(value) => Ok(value),
            Err(coerced_err) => serde_json::from_value(form_to_json(form, |s| {
                serde_json::Value::String(s.to_string())
            }))
            .map_err(|_| Error::Json(coerced_err)),
        }
    }

    // Headers and status

    /// Request header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.req.header(name)
    }

    /// Set a response header, replacing any previous value
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.res.set_header(name, value);
    }

    /// Append a response header
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.res.add_header(name, value);
    }

    /// Response header set so far
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.res.header(name)
    }

    pub fn status(&mut self, status: StatusCode) {
        self.res.status = status;
    }

    pub fn response_status(&self) -> StatusCode {
        self.res.status
    }

    // Response writers

    /// Replace body, content type and status while keeping headers that
    /// middleware already set
    fn update_response_body(
        &mut self,
        status: u16,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let status = StatusCode::from_u16(status)
            .map_err(|_| Error::internal(format!("Invalid status code {}", status)))?;
        self.res.status = status;
        self.res.body = body;
        self.res.set_header("Content-Type", content_type);
        Ok(())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: u16, payload: &T) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        self.update_response_body(status, body, "application/json")
    }

    pub fn text(&mut self, status: u16, payload: impl Into<String>) -> Result<()> {
        self.update_response_body(
            status,
            payload.into().into_bytes(),
            "text/plain; charset=utf-8",
        )
    }

    pub fn html(&mut self, status: u16, payload: impl Into<String>) -> Result<()> {
        self.update_response_body(
            status,
            payload.into().into_bytes(),
            "text/html; charset=utf-8",
        )
    }

    pub fn redirect(&mut self, location: &str) -> Result<()> {
        self.res.status = StatusCode::FOUND;
        self.res.body.clear();
        self.res.set_header("Location", location);
        Ok(())
    }

    // Envelope helpers: {"status": .., "data": .., "message": ..}

    fn envelope<T: Serialize>(
        &mut self,
        status: u16,
        data: Option<T>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.json(status, &Envelope::new(status, data, message))
    }

    pub fn json_ok<T: Serialize>(&mut self, data: T, message: impl Into<String>) -> Result<()> {
        self.envelope(200, Some(data), message)
    }

    pub fn json_created<T: Serialize>(
        &mut self,
        data: T,
        message: impl Into<String>,
    ) -> Result<()> {
        self.envelope(201, Some(data), message)
    }

    pub fn json_accepted<T: Serialize>(
        &mut self,
        data: T,
        message: impl Into<String>,
    ) -> Result<()> {
        self.envelope(202, Some(data), message)
    }

    /// 204 carries no body on the wire, so only the status is set
    pub fn json_no_content(&mut self) -> Result<()> {
        self.res.status = StatusCode::NO_CONTENT;
        self.res.body.clear();
        Ok(())
    }

    pub fn json_bad_request(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(400, None, message)
    }

    pub fn json_unauthorized(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(401, None, message)
    }

    pub fn json_forbidden(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(403, None, message)
    }

    pub fn json_not_found(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(404, None, message)
    }

    pub fn json_method_not_allowed(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(405, None, message)
    }

    pub fn json_conflict(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(409, None, message)
    }

    pub fn json_internal_error(&mut self, message: impl Into<String>) -> Result<()> {
        self.envelope::<()>(500, None, message)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.req.method)
            .field("uri", &self.req.uri)
            .field("params", &self.params)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .field("status", &self.res.status)
            .finish()
    }
}

fn coerce_form_value(raw: &str) -> serde_json::Value {
    if let Ok(n) = raw.parse::<i64>() {
        serde_json::Value::Number(n.into())
    } else if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        serde_json::Value::Number(n)
    } else if raw == "true" || raw == "false" {
        serde_json::Value::Bool(raw == "true")
    } else {
        serde_json::Value::String(raw.to_string())
    }
}

fn form_to_json(
    form: &HashMap<String, Vec<String>>,
    convert: impl Fn(&str) -> serde_json::Value,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, values) in form {
        let value = match values.as_slice() {
            [single] => convert(single),
            many => serde_json::Value::Array(many.iter().map(|s| convert(s)).collect()),
        };
        map.insert(key.clone(), value);
    }
    serde_json::Value::Object(map)
}
