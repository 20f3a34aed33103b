//! Test-specification document validation.
//!
//! The document schema (JSON Schema draft 2020-12) is embedded in the crate.
//! Validation reports every violation, not just the first.

use serde_json::Value;
use tapestry_application::ports::{SchemaValidator, SchemaViolation};
use thiserror::Error;

/// The embedded document schema.
pub const DOCUMENT_SCHEMA: &str = include_str!("test-spec.schema.json");

/// Errors raised while compiling a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema is not a valid draft 2020-12 schema.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// Validates documents against a compiled JSON Schema.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compiles the embedded document schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded schema does not compile.
    pub fn document() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
        Self::from_schema(&schema)
    }

    /// Compiles a custom schema.
    ///
    /// # Errors
    ///
    /// Returns an error if `schema` is not a valid draft 2020-12 schema.
    pub fn from_schema(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::draft202012::new(schema)
            .map_err(|e| SchemaError::Invalid(e.to_string()))?;
        Ok(Self { validator })
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), Vec<SchemaViolation>> {
        let violations: Vec<_> = self
            .validator
            .iter_errors(document)
            .map(|error| SchemaViolation::new(error.instance_path.to_string(), error.to_string()))
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
