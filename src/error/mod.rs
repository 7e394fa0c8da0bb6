use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nex
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Registration-time errors, raised before the server starts
    #[error("Duplicate route: {method} {pattern}")]
    DuplicateRoute { method: String, pattern: String },

    #[error("Invalid regex constraint '{constraint}' in route {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        constraint: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid route pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Request-time errors
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors that can only happen while routes are being registered
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::DuplicateRoute { .. } | Error::InvalidRegex { .. } | Error::InvalidPattern { .. }
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Http(_) => "E_HTTP",
            Error::Json(_) => "E_JSON",
            Error::Xml(_) => "E_XML",
            Error::Io(_) => "E_IO",
            Error::DuplicateRoute { .. } => "E_DUPLICATE_ROUTE",
            Error::InvalidRegex { .. } => "E_INVALID_REGEX",
            Error::InvalidPattern { .. } => "E_INVALID_PATTERN",
            Error::Param(_) => "E_PARAM",
            Error::InvalidInput(_) => "E_INVALID_INPUT",
            Error::Config(_) => "E_CONFIG",
            Error::Internal(_) => "E_INTERNAL",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Json(_) | Error::Xml(_) | Error::Param(_) | Error::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}

/// Where a request value was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
    Form,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Path => write!(f, "path"),
            ParamSource::Query => write!(f, "query"),
            ParamSource::Form => write!(f, "form"),
        }
    }
}

/// Typed conversion failure for path, query and form values.
///
/// Handlers decide which status to answer with; nothing in the router
/// responds on these automatically.
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("{location} parameter '{name}' not found")]
    Missing { location: ParamSource, name: String },

    #[error("{location} parameter '{name}' is not a valid integer: {source}")]
    InvalidInt {
        location: ParamSource,
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("{location} parameter '{name}' is not a valid number: {source}")]
    InvalidFloat {
        location: ParamSource,
        name: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("{location} parameter '{name}' is not a valid boolean: '{value}'")]
    InvalidBool {
        location: ParamSource,
        name: String,
        value: String,
    },

    #[error("{location} parameter '{name}' is not a valid UUID: {source}")]
    InvalidUuid {
        location: ParamSource,
        name: String,
        #[source]
        source: uuid::Error,
    },
}

impl ParamError {
    /// Name of the offending parameter
    pub fn name(&self) -> &str {
        match self {
            ParamError::Missing { name, .. }
            | ParamError::InvalidInt { name, .. }
            | ParamError::InvalidFloat { name, .. }
            | ParamError::InvalidBool { name, .. }
            | ParamError::InvalidUuid { name, .. } => name,
        }
    }

    pub fn location(&self) -> ParamSource {
        match self {
            ParamError::Missing { location, .. }
            | ParamError::InvalidInt { location, .. }
            | ParamError::InvalidFloat { location, .. }
            | ParamError::InvalidBool { location, .. }
            | ParamError::InvalidUuid { location, .. } => *location,
        }
    }
}
