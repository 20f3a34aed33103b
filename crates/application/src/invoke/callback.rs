//! Callback strategy: adapts `fn(args, (error, result))` handlers to the
//! same result contract as [`DirectStrategy`](super::DirectStrategy).

use async_trait::async_trait;
use serde_json::Value;

use super::handler::{Callback, Convention, Handler};
use super::{Invocation, InvocationError, InvocationStrategy};

/// Calls the handler with a trailing callback and waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackStrategy;

#[async_trait]
impl InvocationStrategy for CallbackStrategy {
    fn convention(&self) -> Convention {
        Convention::Callback
    }

    async fn invoke(&self, handler: &Handler, args: Vec<Value>) -> Result<Invocation, InvocationError> {
        let Handler::Callback(function) = handler else {
            return Err(InvocationError::ConventionMismatch {
                strategy: Convention::Callback,
                handler: handler.convention(),
            });
        };
        let (callback, outcome) = Callback::channel();
        function(args, callback);
        outcome
            .await
            .map(Invocation::from)
            .map_err(|_| InvocationError::CallbackDropped)
    }
}
