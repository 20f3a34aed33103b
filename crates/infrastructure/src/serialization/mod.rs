//! Parsing of fixture files into JSON values.
//!
//! Fixtures, inputs, expectations and test documents may be written as
//! JSON or YAML; the format is chosen by file extension.

use std::path::Path;

use serde_json::Value;

/// Error type for parsing operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON parsing failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failed.
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl Format {
    /// Detects the format from a path's extension.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parses `text` in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid in this format.
    pub fn parse(self, text: &str) -> Result<Value, SerializationError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Yaml => Ok(serde_yaml::from_str(text)?),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect(Path::new("a/b.json")), Some(Format::Json));
        assert_eq!(Format::detect(Path::new("b.YML")), Some(Format::Yaml));
        assert_eq!(Format::detect(Path::new("b.toml")), None);
        assert_eq!(Format::detect(Path::new("b")), None);
    }

    #[test]
    fn test_yaml_matches_json() {
        let yaml = "module: ./app\ntests:\n  - name: one\n    input:\n      value: [1, 2]\n";
        assert_eq!(
            Format::Yaml.parse(yaml).unwrap(),
            json!({"module": "./app", "tests": [{"name": "one", "input": {"value": [1, 2]}}]})
        );
        assert!(Format::Json.parse("{").is_err());
    }
}
