//! Module and resource loading port

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

/// Errors raised by a resource loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Nothing exists at the resolved path.
    #[error("resource not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The resource exists but could not be read.
    #[error("cannot read {}: {message}", path.display())]
    Io {
        /// Resolved path.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },

    /// The resource is not valid JSON or YAML.
    #[error("cannot parse {}: {message}", path.display())]
    Parse {
        /// Resolved path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The file extension is not a supported format.
    #[error("unsupported resource format: {}", .0.display())]
    Unsupported(PathBuf),
}

/// Port resolving a path relative to the working directory and returning
/// its loaded value.
///
/// Used for `require` tasks, input and expectation files, stub reply files
/// and HTTP POST payloads. Caching is the loader's concern.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Loads the resource at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is missing, unreadable or malformed.
    async fn load(&self, path: &str) -> Result<Value, LoadError>;
}
