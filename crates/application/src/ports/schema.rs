//! Document schema port

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaViolation {
    /// JSON pointer to the offending part of the document.
    pub instance_path: String,
    /// Validator message.
    pub message: String,
}

impl SchemaViolation {
    /// Creates a violation.
    #[must_use]
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// Port validating a raw document against the recognised schema.
pub trait SchemaValidator: Send + Sync {
    /// Validates `document`, reporting every violation found.
    ///
    /// # Errors
    ///
    /// Returns the full list of violations when the document is invalid.
    fn validate(&self, document: &Value) -> Result<(), Vec<SchemaViolation>>;
}

/// Accepts every document. Useful when the caller validated elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _document: &Value) -> Result<(), Vec<SchemaViolation>> {
        Ok(())
    }
}
