//! Discriminant-tagged encoding shared by targets, message ids and receipts
//!
//! Encoded values are flat JSON objects: the discriminant field sits next to
//! the variant's own fields, with no extra envelope.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Input accepted by the decode entry points: an encoded string or an
/// already decoded mapping.
#[derive(Debug, Clone)]
pub enum Source {
    Encoded(String),
    Decoded(Value),
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Encoded(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Encoded(s)
    }
}

impl From<&String> for Source {
    fn from(s: &String) -> Self {
        Source::Encoded(s.clone())
    }
}

impl From<Value> for Source {
    fn from(v: Value) -> Self {
        Source::Decoded(v)
    }
}

impl From<Map<String, Value>> for Source {
    fn from(m: Map<String, Value>) -> Self {
        Source::Decoded(Value::Object(m))
    }
}

impl Source {
    /// Resolve to a JSON object
    pub fn into_object(self) -> Result<Map<String, Value>> {
        let value = match self {
            Source::Encoded(s) => serde_json::from_str(&s)?,
            Source::Decoded(v) => v,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::invalid_argument(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

/// A value family whose concrete variant is selected by one field
pub trait Tagged: Serialize {
    /// Name of the discriminant field
    const INDEX_KEY: &'static str;

    /// Discriminant of this value
    fn discriminant(&self) -> &'static str;

    /// Encode to a flat JSON object
    fn to_value(&self) -> Result<Value> {
        let value = serde_json::to_value(self)?;
        if !value.is_object() {
            return Err(Error::invalid_argument(format!(
                "{} must encode to a JSON object",
                Self::INDEX_KEY
            )));
        }
        Ok(value)
    }

    /// Encode to a JSON string
    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }
}

/// Read the discriminant of a tagged object without consuming it
///
/// Returns the discriminant alongside the full mapping so the caller can
/// hand the mapping to the variant's structural parser.
pub fn split_discriminant(
    source: impl Into<Source>,
    index_key: &'static str,
) -> Result<(String, Map<String, Value>)> {
    let map = source.into().into_object()?;
    let key = match map.get(index_key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::invalid_argument(format!(
                "{index_key} must be a string, got {other}"
            )))
        }
        None => {
            return Err(Error::invalid_argument(format!(
                "missing discriminant field {index_key}"
            )))
        }
    };
    Ok((key, map))
}
