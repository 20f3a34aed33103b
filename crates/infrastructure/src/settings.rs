//! Seed context and engine settings loading.
//!
//! Both are layered with the `config` crate: an optional file (JSON, YAML
//! or TOML, chosen by extension) overridden by environment variables.
//!
//! | source | prefix | example |
//! |---|---|---|
//! | seed | `TAPESTRY__` | `TAPESTRY__USE_MOCKS=true`, `TAPESTRY__REGION=eu-west-1` |
//! | engine | `TAPESTRY_ENGINE__` | `TAPESTRY_ENGINE__MAX_CONCURRENCY=4` |
//!
//! Environment keys are lowercased, so seed flags are spelled in snake case
//! there (`use_mocks`, `name_of_test_suite`).

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use tapestry_domain::{EngineSettings, SeedContext};
use tracing::debug;

/// Environment prefix for seed fields.
pub const SEED_PREFIX: &str = "TAPESTRY";
/// Environment prefix for engine settings.
pub const ENGINE_PREFIX: &str = "TAPESTRY_ENGINE";

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file or environment could not be read or deserialised.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A configured file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(String),
}

/// Loads the seed context from `path` (optional) and `TAPESTRY__*` variables.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_seed(path: Option<&Path>) -> Result<SeedContext, SettingsError> {
    load(path, SEED_PREFIX, None)
}

/// Loads engine settings from `path` (optional) and `TAPESTRY_ENGINE__*` variables.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings, SettingsError> {
    load(path, ENGINE_PREFIX, None)
}

/// Like [`load_seed`], reading variables from `vars` instead of the process
/// environment.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_seed_with(
    path: Option<&Path>,
    vars: HashMap<String, String>,
) -> Result<SeedContext, SettingsError> {
    load(path, SEED_PREFIX, Some(vars))
}

/// Like [`load_settings`], reading variables from `vars` instead of the
/// process environment.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_settings_with(
    path: Option<&Path>,
    vars: HashMap<String, String>,
) -> Result<EngineSettings, SettingsError> {
    load(path, ENGINE_PREFIX, Some(vars))
}

fn load<T: DeserializeOwned>(
    path: Option<&Path>,
    prefix: &str,
    vars: Option<HashMap<String, String>>,
) -> Result<T, SettingsError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        if !path.is_file() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        debug!(path = %path.display(), "loading configuration file");
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(vars),
    );
    Ok(builder.build()?.try_deserialize()?)
}
