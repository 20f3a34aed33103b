//! Caller-supplied seed context and engine settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Seed object cloned into every test case's context as `config`.
///
/// Besides the two recognised flags it carries arbitrary fields (credentials,
/// hosts, ...) that templates and request signing read from `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeedContext {
    /// Use `serviceStubs` instead of `setupCalls` (unit runs).
    #[serde(default, alias = "use_mocks")]
    pub use_mocks: bool,
    /// Explicit name of the registered suite.
    #[serde(default, alias = "name_of_test_suite", skip_serializing_if = "Option::is_none")]
    pub name_of_test_suite: Option<String>,
    /// Every other seed field.
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl SeedContext {
    /// Creates an empty seed for unit runs.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            use_mocks: true,
            ..Self::default()
        }
    }

    /// Sets an arbitrary seed field (builder pattern).
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Name of the registered suite: the explicit name, or `unit` /
    /// `integration` depending on `use_mocks`.
    #[must_use]
    pub fn suite_name(&self) -> &str {
        match &self.name_of_test_suite {
            Some(name) => name,
            None if self.use_mocks => "unit",
            None => "integration",
        }
    }

    /// The seed as the JSON object stored under `context.config`.
    #[must_use]
    pub fn to_config(&self) -> Value {
        let mut config = self.values.clone();
        config.insert("useMocks".to_string(), Value::Bool(self.use_mocks));
        if let Some(name) = &self.name_of_test_suite {
            config.insert("nameOfTestSuite".to_string(), Value::String(name.clone()));
        }
        Value::Object(config)
    }
}

/// Engine-wide settings that are not part of the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Directory relative paths are resolved against (working directory when unset).
    #[serde(alias = "base_dir")]
    pub base_dir: Option<PathBuf>,
    /// Maximum number of cases the runner executes at once.
    #[serde(alias = "max_concurrency")]
    pub max_concurrency: usize,
    /// Stop running further cases after the first failure.
    #[serde(alias = "stop_on_first_failure")]
    pub stop_on_first_failure: bool,
    /// Cache loaded resources by resolved path.
    #[serde(alias = "cache_resources")]
    pub cache_resources: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_concurrency: 1,
            stop_on_first_failure: false,
            cache_resources: true,
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
    fn test_suite_name_defaults() {
        assert_eq!(SeedContext::default().suite_name(), "integration");
        assert_eq!(SeedContext::unit().suite_name(), "unit");

        let named = SeedContext {
            name_of_test_suite: Some("smoke".to_string()),
            ..SeedContext::unit()
        };
        assert_eq!(named.suite_name(), "smoke");
    }

    #[test]
    fn test_seed_keeps_extra_fields() {
        let seed: SeedContext = serde_json::from_value(json!({
            "useMocks": true,
            "region": "eu-west-1"
        }))
        .unwrap();
        assert!(seed.use_mocks);
        assert_eq!(seed.values.get("region"), Some(&json!("eu-west-1")));

        let config = seed.to_config();
        assert_eq!(config["region"], json!("eu-west-1"));
        assert_eq!(config["useMocks"], json!(true));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: EngineSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.max_concurrency, 1);
        assert!(settings.cache_resources);
    }
}
