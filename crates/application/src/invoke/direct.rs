//! Direct-result strategy.

use async_trait::async_trait;
use serde_json::Value;

use super::handler::{Convention, Handler};
use super::{Invocation, InvocationError, InvocationStrategy};

/// Awaits the handler's returned future.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrategy;

#[async_trait]
impl InvocationStrategy for DirectStrategy {
    fn convention(&self) -> Convention {
        Convention::Direct
    }

    async fn invoke(&self, handler: &Handler, args: Vec<Value>) -> Result<Invocation, InvocationError> {
        let Handler::Direct(function) = handler else {
            return Err(InvocationError::ConventionMismatch {
                strategy: Convention::Direct,
                handler: handler.convention(),
            });
        };
        Ok(function(args).await.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tapestry_domain::AppError;

    #[tokio::test]
    async fn test_returned_and_raised() {
        let handler = Handler::direct(|args: Vec<Value>| async move {
            match args.first() {
                Some(Value::Bool(true)) => Err(AppError::new("boom")),
                _ => Ok(json!({"args": args})),
            }
        });

        let returned = DirectStrategy.invoke(&handler, vec![json!(1)]).await.unwrap();
        assert_eq!(returned, Invocation::Returned(json!({"args": [1]})));

        let raised = DirectStrategy.invoke(&handler, vec![json!(true)]).await.unwrap();
        assert_eq!(raised, Invocation::Raised(AppError::new("boom")));
    }

    #[tokio::test]
    async fn test_rejects_callback_handler() {
        let handler = Handler::callback(|_, callback| callback.ok(Value::Null));
        let err = DirectStrategy.invoke(&handler, vec![]).await.unwrap_err();
        assert!(matches!(err, InvocationError::ConventionMismatch { .. }));
    }
}
