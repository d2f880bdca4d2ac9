//! Decoded HTTP response bodies
//!
//! The backend answers with JSON, plain text or nothing at all, sometimes
//! regardless of the declared content type. Every body is folded into one of
//! three variants exactly once so callers match instead of probing fields.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::constants::MESSAGE_FIELDS;

/// A response body after the single decode step
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed JSON (object, array or scalar)
    Structured(Value),
    /// Raw text, including JSON-looking text that failed to parse
    Text(String),
    /// No body, or only whitespace
    Empty,
}

impl ResponseBody {
    /// JSON view of the body: text becomes `{ "message": text }`, empty
    /// becomes `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Structured(value) => value.clone(),
            Self::Text(text) => json!({ "message": text }),
            Self::Empty => Value::Null,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Text(text) => json!({ "message": text }),
            Self::Empty => Value::Null,
        }
    }

    /// Field of a structured object body.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Structured(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }

    /// Best human-readable message: `message`, `error`, then `detail` for
    /// objects; the trimmed text for text bodies.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Structured(_) => MESSAGE_FIELDS.iter().find_map(|name| {
                self.field(name)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            }),
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Empty => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
