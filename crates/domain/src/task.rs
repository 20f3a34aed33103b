//! Setup and teardown tasks
//!
//! A task is a declarative description of one side effect performed before
//! (or after) the application under test is invoked. The set of task types is
//! closed: adding a variant here forces every dispatcher `match` to handle it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::method::HttpMethod;
use crate::source::ValueSource;

/// One setup/teardown side effect, selected by `taskType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "taskType", rename_all = "camelCase")]
pub enum Task {
    /// Perform an HTTP call and store the parsed JSON response.
    Http(HttpTask),
    /// Load a resource and store it.
    Require(RequireTask),
    /// Install scripted fakes for a service class.
    Stub(StubTask),
}

impl Task {
    /// The `taskType` tag of this task.
    #[must_use]
    pub const fn task_type(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Require(_) => "require",
            Self::Stub(_) => "stub",
        }
    }

    /// The context key this task writes, if it writes one.
    #[must_use]
    pub fn context_key(&self) -> Option<&str> {
        match self {
            Self::Http(task) => Some(&task.context_key),
            Self::Require(task) => Some(&task.context_key),
            Self::Stub(_) => None,
        }
    }
}

/// Request-signing scheme for `http` tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthKind {
    /// AWS Signature Version 4, keyed by `context.config`.
    #[serde(rename = "AWS_IAM")]
    AwsIam,
}

/// `http` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTask {
    /// URL template, rendered against the context.
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// HTTP method.
    pub http_method: HttpMethod,
    /// Path to a JSON payload, sent for POST only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Optional signing scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthKind>,
    /// Where the parsed response is stored.
    pub context_key: String,
}

/// `require` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequireTask {
    /// Resource path, relative to the working directory.
    pub require_path: String,
    /// Where the loaded value is stored.
    pub context_key: String,
}

/// `stub` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubTask {
    /// Module that exports the class.
    pub require_path: String,
    /// Class whose methods are replaced.
    pub class_name: String,
    /// Scripted methods.
    #[serde(default)]
    pub methods: Vec<StubMethodSpec>,
}

/// Scripted replies for one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubMethodSpec {
    /// Method name.
    pub name: String,
    /// One entry per successive invocation.
    #[serde(default)]
    pub calls: Vec<StubCall>,
}

/// The reply for one invocation slot of a fake method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubCall {
    /// Reply payload, inline or from a file.
    #[serde(flatten)]
    pub source: ValueSource,
    /// The payload is a sequence; its first element is the reply.
    #[serde(default)]
    pub spread: bool,
    /// How the payload is delivered.
    pub stub_method: StubBehavior,
}

/// Scripted-return semantics of a fake invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StubBehavior {
    /// Return the payload.
    Returns,
    /// Resolve with the payload.
    Resolves,
    /// Fail with the payload as the error.
    Throws,
    /// Reject with the payload as the error.
    Rejects,
}

impl StubBehavior {
    /// Whether the payload is delivered as an error.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Throws | Self::Rejects)
    }
}
