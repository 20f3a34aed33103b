//! Failure values raised by the application under test and by its fakes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// An application-level error.
///
/// Expected-error assertions address its fields by dot path, so it is
/// represented as a JSON object: `name`, `message` and any extra fields.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct AppError {
    /// Error class name (`Error` unless set).
    #[serde(default = "default_name")]
    pub name: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Additional fields (`code`, `statusCode`, ...).
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

fn default_name() -> String {
    "Error".to_string()
}

impl AppError {
    /// Creates an `Error` with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            message: message.into(),
            data: Map::new(),
        }
    }

    /// Sets the error name (builder pattern).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an extra field (builder pattern).
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Builds an error from an arbitrary payload.
    ///
    /// Objects keep their fields; strings become the message; anything else
    /// is kept under `value` with its JSON text as the message.
    #[must_use]
    pub fn from_value(payload: Value) -> Self {
        match payload {
            Value::Object(mut map) => {
                let name = match map.remove("name") {
                    Some(Value::String(name)) => name,
                    _ => default_name(),
                };
                let message = match map.remove("message") {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Self {
                    name,
                    message,
                    data: map,
                }
            }
            Value::String(message) => Self::new(message),
            other => Self::new(other.to_string()).with_field("value", other),
        }
    }

    /// The error as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("message".to_string(), Value::String(self.message.clone()));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_object_payload_keeps_fields() {
        let error = AppError::from_value(json!({
            "name": "NotFound",
            "message": "no such user",
            "statusCode": 404
        }));
        assert_eq!(error.name, "NotFound");
        assert_eq!(error.message, "no such user");
        assert_eq!(
            error.to_value(),
            json!({"name": "NotFound", "message": "no such user", "statusCode": 404})
        );
    }

    #[test]
    fn test_string_payload_becomes_message() {
        let error = AppError::from_value(json!("boom"));
        assert_eq!(error.to_string(), "Error: boom");
    }

    #[test]
    fn test_scalar_payload_is_kept() {
        let error = AppError::from_value(json!(42));
        assert_eq!(error.message, "42");
        assert_eq!(error.data.get("value"), Some(&json!(42)));
    }
}
