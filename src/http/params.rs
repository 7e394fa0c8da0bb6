//! Typed conversion of path, query and form values
//!
//! An absent value and an empty value are treated the same: both are
//! [`ParamError::Missing`].

use crate::error::{ParamError, ParamSource};
use uuid::Uuid;

/// Parse a boolean using the accepted spellings
/// `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Borrowed raw value tagged with where it came from
#[derive(Debug, Clone, Copy)]
pub struct RawParam<'a> {
    location: ParamSource,
    name: &'a str,
    value: Option<&'a str>,
}

impl<'a> RawParam<'a> {
    pub fn new(location: ParamSource, name: &'a str, value: Option<&'a str>) -> Self {
        Self {
            location,
            name,
            value,
        }
    }

    /// The value, or [`ParamError::Missing`] if absent or empty
    pub fn required(&self) -> Result<&'a str, ParamError> {
        match self.value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ParamError::Missing {
                location: self.location,
                name: self.name.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<String, ParamError> {
        self.required().map(str::to_string)
    }

    pub fn as_int(&self) -> Result<i64, ParamError> {
        self.required()?
            .parse::<i64>()
            .map_err(|source| ParamError::InvalidInt {
                location: self.location,
                name: self.name.to_string(),
                source,
            })
    }

    pub fn as_float(&self) -> Result<f64, ParamError> {
        self.required()?
            .parse::<f64>()
            .map_err(|source| ParamError::InvalidFloat {
                location: self.location,
                name: self.name.to_string(),
                source,
            })
    }

    pub fn as_bool(&self) -> Result<bool, ParamError> {
        let value = self.required()?;
        parse_bool(value).ok_or_else(|| ParamError::InvalidBool {
            location: self.location,
            name: self.name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn as_uuid(&self) -> Result<Uuid, ParamError> {
        Uuid::parse_str(self.required()?).map_err(|source| ParamError::InvalidUuid {
            location: self.location,
            name: self.name.to_string(),
            source,
        })
    }
}
