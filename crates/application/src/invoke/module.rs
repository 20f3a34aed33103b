//! Application modules addressed by a document's `module` / `moduleKey`.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::handler::Handler;
use crate::mock::module_id;

/// Errors raised while resolving the application under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// No module is registered under the path.
    #[error("application module not found: {0}")]
    NotFound(String),

    /// The module has no export with that key.
    #[error("module {module} has no export {key}")]
    MissingExport {
        /// Module path.
        module: String,
        /// Requested export.
        key: String,
    },

    /// The module is a namespace and no `moduleKey` selected an export.
    #[error("module {0} is not callable; set moduleKey to select an export")]
    NotCallable(String),
}

/// What a module exports.
#[derive(Debug, Clone)]
pub enum ModuleExports {
    /// The module itself is the handler.
    Handler(Handler),
    /// Named exports.
    Namespace(BTreeMap<String, Handler>),
}

/// Application modules by canonical path.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleExports>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module whose default export is `handler`.
    pub fn register_handler(&mut self, module: &str, handler: Handler) {
        self.modules
            .insert(module_id(module), ModuleExports::Handler(handler));
    }

    /// Registers one named export, turning the module into a namespace.
    pub fn register_export(&mut self, module: &str, key: impl Into<String>, handler: Handler) {
        let entry = self
            .modules
            .entry(module_id(module))
            .or_insert_with(|| ModuleExports::Namespace(BTreeMap::new()));
        match entry {
            ModuleExports::Namespace(exports) => {
                exports.insert(key.into(), handler);
            }
            ModuleExports::Handler(_) => {
                *entry = ModuleExports::Namespace(BTreeMap::from([(key.into(), handler)]));
            }
        }
    }

    /// Whether a module is registered.
    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(&module_id(module))
    }

    /// Resolves the handler for `module`, selecting `key` when given.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] when the module or export is missing, or a
    /// namespace is used without a key.
    pub fn resolve(&self, module: &str, key: Option<&str>) -> Result<Handler, ModuleError> {
        let exports = self
            .modules
            .get(&module_id(module))
            .ok_or_else(|| ModuleError::NotFound(module.to_string()))?;
        match (exports, key) {
            (ModuleExports::Handler(handler), None) => Ok(handler.clone()),
            (ModuleExports::Namespace(named), Some(key)) => {
                named
                    .get(key)
                    .cloned()
                    .ok_or_else(|| ModuleError::MissingExport {
                        module: module.to_string(),
                        key: key.to_string(),
                    })
            }
            (ModuleExports::Handler(_), Some(key)) => Err(ModuleError::MissingExport {
                module: module.to_string(),
                key: key.to_string(),
            }),
            (ModuleExports::Namespace(_), None) => Err(ModuleError::NotCallable(module.to_string())),
        }
    }
}
