//! Collaborator services looked up by the application under test.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tapestry_domain::AppError;

/// A collaborator class whose methods can be replaced by fakes.
///
/// Application code resolves services through the
/// [`ServiceRegistry`](super::ServiceRegistry) on every call, so an installed
/// fake is observed as soon as it is installed.
#[async_trait]
pub trait Service: Send + Sync {
    /// Calls `method` with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns the application-level error raised by the method.
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, AppError>;
}

type MethodFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

/// A [`Service`] assembled from closures, one per method.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodFn>,
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method (builder pattern).
    #[must_use]
    pub fn with_method<F, Fut>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(move |args| method(args).boxed()));
        self
    }

    /// Whether the table has a method.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

#[async_trait]
impl Service for MethodTable {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, AppError> {
        match self.methods.get(method) {
            Some(function) => function(args).await,
            None => Err(AppError::new(format!("{method} is not a function")).with_name("TypeError")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_method_table_dispatches_by_name() {
        let table = MethodTable::new()
            .with_method("echo", |args| async move { Ok(Value::Array(args)) });

        assert!(table.has_method("echo"));
        assert_eq!(table.call("echo", vec![json!(1)]).await.unwrap(), json!([1]));

        let err = table.call("missing", vec![]).await.unwrap_err();
        assert_eq!(err.name, "TypeError");
    }
}
