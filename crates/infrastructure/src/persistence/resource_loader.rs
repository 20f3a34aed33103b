//! File system resource loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tapestry_application::ports::{LoadError, ResourceLoader};
use tokio::fs;
use tracing::debug;

use crate::serialization::Format;

/// Loads JSON and YAML resources relative to a base directory using `tokio::fs`.
///
/// Paths without an extension resolve to `<path>.json`, then `<path>.yaml`.
/// Parsed resources are cached by resolved path unless caching is disabled.
#[derive(Debug, Default)]
pub struct FsResourceLoader {
    base_dir: PathBuf,
    cache: Option<Mutex<HashMap<PathBuf, Value>>>,
}

impl FsResourceLoader {
    /// Creates a caching loader rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: Some(Mutex::default()),
        }
    }

    /// Enables or disables the parse cache.
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(Mutex::default);
        self
    }

    /// Directory relative paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn resolve(&self, path: &str) -> Result<(PathBuf, Format), LoadError> {
        let candidate = self.base_dir.join(path);
        if let Some(format) = Format::detect(&candidate) {
            return Ok((candidate, format));
        }
        if candidate.extension().is_some() {
            return Err(LoadError::Unsupported(candidate));
        }
        for extension in ["json", "yaml", "yml"] {
            let with_extension = candidate.with_extension(extension);
            if fs::metadata(&with_extension).await.is_ok_and(|m| m.is_file()) {
                let format = Format::detect(&with_extension).unwrap_or(Format::Json);
                return Ok((with_extension, format));
            }
        }
        Err(LoadError::NotFound(candidate))
    }

    fn cached(&self, path: &Path) -> Option<Value> {
        self.cache.as_ref().and_then(|cache| {
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(path)
                .cloned()
        })
    }

    fn remember(&self, path: PathBuf, value: &Value) {
        if let Some(cache) = &self.cache {
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path, value.clone());
        }
    }
}

#[async_trait]
impl ResourceLoader for FsResourceLoader {
    async fn load(&self, path: &str) -> Result<Value, LoadError> {
        let (resolved, format) = self.resolve(path).await?;
        if let Some(value) = self.cached(&resolved) {
            return Ok(value);
        }

        let text = fs::read_to_string(&resolved).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(resolved.clone())
            } else {
                LoadError::Io {
                    path: resolved.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        let value = format.parse(&text).map_err(|e| LoadError::Parse {
            path: resolved.clone(),
            message: e.to_string(),
        })?;

        debug!(path = %resolved.display(), "resource loaded");
        self.remember(resolved, &value);
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_load_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        write(&dir, "fixtures/user.json", r#"{"id": 1}"#);
        write(&dir, "fixtures/order.yaml", "id: 2\nitems: [a]\n");
        let loader = FsResourceLoader::new(dir.path());

        assert_eq!(loader.load("./fixtures/user.json").await.unwrap(), json!({"id": 1}));
        assert_eq!(
            loader.load("fixtures/order.yaml").await.unwrap(),
            json!({"id": 2, "items": ["a"]})
        );
    }

    #[tokio::test]
    async fn test_extensionless_path() {
        let dir = TempDir::new().unwrap();
        write(&dir, "data.json", "[1, 2]");
        let loader = FsResourceLoader::new(dir.path());
        assert_eq!(loader.load("./data").await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.json", "{");
        write(&dir, "notes.txt", "hi");
        let loader = FsResourceLoader::new(dir.path());

        assert!(matches!(
            loader.load("missing.json").await,
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(loader.load("missing").await, Err(LoadError::NotFound(_))));
        assert!(matches!(
            loader.load("broken.json").await,
            Err(LoadError::Parse { .. })
        ));
        assert!(matches!(
            loader.load("notes.txt").await,
            Err(LoadError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_cache() {
        let dir = TempDir::new().unwrap();
        write(&dir, "v.json", "1");
        let cached = FsResourceLoader::new(dir.path());
        let uncached = FsResourceLoader::new(dir.path()).with_cache(false);

        assert_eq!(cached.load("v.json").await.unwrap(), json!(1));
        assert_eq!(uncached.load("v.json").await.unwrap(), json!(1));
        write(&dir, "v.json", "2");

        assert_eq!(cached.load("v.json").await.unwrap(), json!(1));
        assert_eq!(uncached.load("v.json").await.unwrap(), json!(2));
    }
}
