//! Invocation of the application under test
//!
//! An [`InvocationStrategy`] turns a handler call into an [`Invocation`]:
//! either the returned value or the application error it raised. Failures
//! of the invocation machinery itself are [`InvocationError`]s.

mod callback;
mod direct;
mod handler;
mod module;

pub use callback::CallbackStrategy;
pub use direct::DirectStrategy;
pub use handler::{Callback, Convention, Handler};
pub use module::{ModuleError, ModuleExports, ModuleRegistry};

use async_trait::async_trait;
use serde_json::Value;
use tapestry_domain::{AppError, DomainError, InputSpec, ValueSource};
use thiserror::Error;

use crate::ports::{LoadError, ResourceLoader};

/// Outcome of calling the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// The application returned a value.
    Returned(Value),
    /// The application raised an error.
    Raised(AppError),
}

impl Invocation {
    /// The value assertions run against: the returned value, or the error
    /// as a JSON object.
    #[must_use]
    pub fn subject(&self) -> Value {
        match self {
            Self::Returned(value) => value.clone(),
            Self::Raised(error) => error.to_value(),
        }
    }

    /// Whether the application raised an error.
    #[must_use]
    pub const fn is_raised(&self) -> bool {
        matches!(self, Self::Raised(_))
    }
}

impl From<Result<Value, AppError>> for Invocation {
    fn from(result: Result<Value, AppError>) -> Self {
        match result {
            Ok(value) => Self::Returned(value),
            Err(error) => Self::Raised(error),
        }
    }
}

/// Failures of the invocation machinery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The strategy cannot call a handler of this convention.
    #[error("{strategy} strategy cannot invoke a {handler} handler")]
    ConventionMismatch {
        /// Convention of the strategy.
        strategy: Convention,
        /// Convention of the handler.
        handler: Convention,
    },

    /// The handler dropped its callback without calling it.
    #[error("handler dropped its callback without calling it")]
    CallbackDropped,

    /// The input could not be turned into arguments.
    #[error("invalid input: {0}")]
    Input(#[from] DomainError),

    /// The input file could not be loaded.
    #[error("cannot load input: {0}")]
    Load(#[from] LoadError),
}

/// Calling convention adapter; the orchestrator only sees this trait.
#[async_trait]
pub trait InvocationStrategy: Send + Sync {
    /// Convention of the handlers this strategy calls.
    fn convention(&self) -> Convention;

    /// Calls `handler` with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns an [`InvocationError`] when the call itself cannot be made or
    /// completed. Application errors are `Ok(Invocation::Raised(_))`.
    async fn invoke(&self, handler: &Handler, args: Vec<Value>) -> Result<Invocation, InvocationError>;
}

/// Resolves a case's input into positional arguments.
///
/// No input is an empty argument list. File inputs are loaded now.
///
/// # Errors
///
/// Fails if the file cannot be loaded or `spread` is set on a non-sequence.
pub async fn resolve_arguments(
    input: Option<&InputSpec>,
    loader: &dyn ResourceLoader,
) -> Result<Vec<Value>, InvocationError> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    let value = match &input.source {
        ValueSource::Inline { value } => value.clone(),
        ValueSource::File { file } => loader.load(file).await?,
    };
    Ok(input.arguments(value)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatch::tests::MapLoader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_arguments() {
        let loader = MapLoader::default().with("./in.json", json!([1, 2]));

        assert_eq!(resolve_arguments(None, &loader).await.unwrap(), Vec::<Value>::new());

        let inline = InputSpec::value(json!({"a": 1}));
        assert_eq!(
            resolve_arguments(Some(&inline), &loader).await.unwrap(),
            vec![json!({"a": 1})]
        );

        let from_file = InputSpec {
            source: ValueSource::file("./in.json"),
            spread: true,
        };
        assert_eq!(
            resolve_arguments(Some(&from_file), &loader).await.unwrap(),
            vec![json!(1), json!(2)]
        );

        let missing = InputSpec {
            source: ValueSource::file("./nope.json"),
            spread: false,
        };
        assert!(matches!(
            resolve_arguments(Some(&missing), &loader).await,
            Err(InvocationError::Load(_))
        ));
    }

    #[test]
    fn test_subject_of_raised_error() {
        let raised = Invocation::Raised(AppError::new("bad").with_field("code", json!(400)));
        assert!(raised.is_raised());
        assert_eq!(
            raised.subject(),
            json!({"name": "Error", "message": "bad", "code": 400})
        );
    }
}
