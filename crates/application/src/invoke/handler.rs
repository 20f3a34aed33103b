//! Application entry points.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tapestry_domain::AppError;
use tokio::sync::oneshot;

/// Calling convention of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Returns its result.
    Direct,
    /// Reports its result through a trailing callback.
    Callback,
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::Callback => "callback",
        })
    }
}

type DirectFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync;
type CallbackFn = dyn Fn(Vec<Value>, Callback) + Send + Sync;

/// The `(error, result)` callback handed to callback-style handlers.
///
/// Consumed by the first call; dropping it uncalled is reported as an
/// invocation error.
#[derive(Debug)]
pub struct Callback {
    sender: oneshot::Sender<Result<Value, AppError>>,
}

impl Callback {
    pub(super) fn channel() -> (Self, oneshot::Receiver<Result<Value, AppError>>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Reports the outcome. An error wins over a result; a missing result
    /// is `null`.
    pub fn call(self, error: Option<AppError>, result: Option<Value>) {
        let outcome = error.map_or_else(|| Ok(result.unwrap_or(Value::Null)), Err);
        // The receiver is gone only when the invocation was abandoned.
        let _ = self.sender.send(outcome);
    }

    /// Reports success.
    pub fn ok(self, result: Value) {
        self.call(None, Some(result));
    }

    /// Reports failure.
    pub fn fail(self, error: AppError) {
        self.call(Some(error), None);
    }
}

/// The application function under test.
#[derive(Clone)]
pub enum Handler {
    /// `async fn(args) -> Result<Value, AppError>`.
    Direct(Arc<DirectFn>),
    /// `fn(args, callback)`.
    Callback(Arc<CallbackFn>),
}

impl Handler {
    /// Wraps an async function.
    #[must_use]
    pub fn direct<F, Fut>(function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        Self::Direct(Arc::new(move |args| function(args).boxed()))
    }

    /// Wraps a callback-style function.
    #[must_use]
    pub fn callback<F>(function: F) -> Self
    where
        F: Fn(Vec<Value>, Callback) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(function))
    }

    /// The handler's calling convention.
    #[must_use]
    pub const fn convention(&self) -> Convention {
        match self {
            Self::Direct(_) => Convention::Direct,
            Self::Callback(_) => Convention::Callback,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.convention()).finish()
    }
}
