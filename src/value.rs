//! Typed argument values and the primitive coercion rules used by the binder.
//!
//! Replaces reflection-based coercion with an explicit, closed tag (`ArgType`) describing how a
//! raw wire string (from a query parameter, a path capture, or a scalar JSON field rendered back
//! to text) should be parsed into a typed `ArgValue`.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::DispatchError;

/// The coercion an argument's raw text should go through.
#[derive(Clone)]
pub enum ArgType {
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Char,
    String,
    DateTime,
    /// One of a fixed set of accepted strings (case-sensitive).
    Enum(Arc<[String]>),
    /// A caller-supplied parser for types the built-in tags don't cover.
    UserReader(Arc<dyn Fn(&str) -> Result<ArgValue, DispatchError> + Send + Sync>),
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Int32 => write!(f, "Int32"),
            ArgType::Int64 => write!(f, "Int64"),
            ArgType::Float32 => write!(f, "Float32"),
            ArgType::Float64 => write!(f, "Float64"),
            ArgType::Bool => write!(f, "Bool"),
            ArgType::Char => write!(f, "Char"),
            ArgType::String => write!(f, "String"),
            ArgType::DateTime => write!(f, "DateTime"),
            ArgType::Enum(values) => write!(f, "Enum({:?})", values),
            ArgType::UserReader(_) => write!(f, "UserReader(..)"),
        }
    }
}

/// A typed, already-coerced argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Char(char),
    String(String),
    DateTime(OffsetDateTime),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int32(v) => Some(*v as i64),
            ArgValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Parses `raw` according to `ty`, producing `DispatchError::BadRequest` on any failure. This is
/// the single coercion chokepoint the binder calls for every query, path, and scalar-body
/// argument.
pub fn read_primitive(ty: &ArgType, raw: &str) -> Result<ArgValue, DispatchError> {
    match ty {
        ArgType::Int32 => raw
            .parse::<i32>()
            .map(ArgValue::Int32)
            .map_err(|_| DispatchError::bad_request(format!("expected an integer, got {:?}", raw))),
        ArgType::Int64 => raw
            .parse::<i64>()
            .map(ArgValue::Int64)
            .map_err(|_| DispatchError::bad_request(format!("expected an integer, got {:?}", raw))),
        ArgType::Float32 => raw
            .parse::<f32>()
            .map(ArgValue::Float32)
            .map_err(|_| DispatchError::bad_request(format!("expected a number, got {:?}", raw))),
        ArgType::Float64 => raw
            .parse::<f64>()
            .map(ArgValue::Float64)
            .map_err(|_| DispatchError::bad_request(format!("expected a number, got {:?}", raw))),
        ArgType::Bool => match raw {
            "true" => Ok(ArgValue::Bool(true)),
            "false" => Ok(ArgValue::Bool(false)),
            _ => Err(DispatchError::bad_request(format!(
                "expected true or false, got {:?}",
                raw
            ))),
        },
        ArgType::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(ArgValue::Char(c)),
                _ => Err(DispatchError::bad_request(format!(
                    "expected a single character, got {:?}",
                    raw
                ))),
            }
        }
        ArgType::String => Ok(ArgValue::String(raw.to_string())),
        ArgType::DateTime => {
            OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
                .map(ArgValue::DateTime)
                .map_err(|_| DispatchError::bad_request(format!("expected an ISO-8601 timestamp, got {:?}", raw)))
        }
        ArgType::Enum(values) => {
            if values.iter().any(|v| v == raw) {
                Ok(ArgValue::String(raw.to_string()))
            } else {
                Err(DispatchError::bad_request(format!(
                    "expected one of {:?}, got {:?}",
                    values, raw
                )))
            }
        }
        ArgType::UserReader(f) => f(raw),
    }
}
