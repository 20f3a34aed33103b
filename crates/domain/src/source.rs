//! Inline-or-file value references
//!
//! Inputs, expectations and stub replies either carry their value inline
//! (`{ "value": ... }`) or point at a JSON/YAML resource (`{ "file": "./x.json" }`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    /// Loaded through the resource loader, relative to the working directory.
    File {
        /// Path of the resource.
        file: String,
    },
    /// Given inline. A missing `value` is `null`.
    Inline {
        /// The inline value.
        #[serde(default)]
        value: Value,
    },
}

impl ValueSource {
    /// Creates an inline source.
    #[must_use]
    pub const fn inline(value: Value) -> Self {
        Self::Inline { value }
    }

    /// Creates a file-backed source.
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self::File { file: path.into() }
    }

    /// Returns the file path when this source is file-backed.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::File { file } => Some(file),
            Self::Inline { .. } => None,
        }
    }
}

impl Default for ValueSource {
    fn default() -> Self {
        Self::Inline { value: Value::Null }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_file_takes_precedence() {
        let source: ValueSource = serde_json::from_value(json!({"file": "./a.json"})).unwrap();
        assert_eq!(source.file_path(), Some("./a.json"));
    }

    #[test]
    fn test_missing_value_is_null() {
        let source: ValueSource = serde_json::from_value(json!({})).unwrap();
        assert_eq!(source, ValueSource::inline(Value::Null));
    }
}
