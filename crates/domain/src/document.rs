//! Test-specification documents and their test cases.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::Assertion;
use crate::error::{DomainError, DomainResult};
use crate::source::ValueSource;
use crate::task::Task;

/// A whole test-specification document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSpecDocument {
    /// Reference to the application module under test.
    pub module: String,
    /// Selects a named export of the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_key: Option<String>,
    /// Test cases, in registration order.
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// How the runner treats a registered case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    /// Run normally.
    #[default]
    Normal,
    /// Run exclusively (with the other `only` cases).
    Only,
    /// Register but do not run.
    Skip,
}

/// One declarative test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Case name shown by the runner.
    pub name: String,
    /// Run this case exclusively.
    #[serde(default)]
    pub only: bool,
    /// Skip this case.
    #[serde(default)]
    pub skip: bool,
    /// Setup tasks for integration runs.
    #[serde(default)]
    pub setup_calls: Vec<Task>,
    /// Setup tasks for runs with `useMocks` set.
    #[serde(default)]
    pub service_stubs: Vec<Task>,
    /// Arguments for the application under test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSpec>,
    /// Expected successful output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Expectation>,
    /// Expected application error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<Expectation>,
    /// Teardown tasks.
    #[serde(default)]
    pub teardown_calls: Vec<Task>,
}

impl TestCase {
    /// Creates a case with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Runner mode. `only` wins over `skip`.
    #[must_use]
    pub const fn mode(&self) -> CaseMode {
        if self.only {
            CaseMode::Only
        } else if self.skip {
            CaseMode::Skip
        } else {
            CaseMode::Normal
        }
    }

    /// Setup tasks for the active configuration.
    #[must_use]
    pub fn setup_tasks(&self, use_mocks: bool) -> &[Task] {
        if use_mocks {
            &self.service_stubs
        } else {
            &self.setup_calls
        }
    }

    /// The expectation assertions run against: the expected error when one
    /// is declared, the expected output otherwise.
    #[must_use]
    pub fn expectation(&self) -> Option<&Expectation> {
        self.expected_error.as_ref().or(self.expected_output.as_ref())
    }

    /// Whether an application error is the expected outcome.
    #[must_use]
    pub const fn expects_error(&self) -> bool {
        self.expected_error.is_some()
    }
}

/// Arguments for the application under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InputSpec {
    /// Argument value, inline or from a file.
    #[serde(flatten)]
    pub source: ValueSource,
    /// The value is a sequence of positional arguments.
    #[serde(default)]
    pub spread: bool,
}

impl InputSpec {
    /// Creates an inline, non-spread input.
    #[must_use]
    pub const fn value(value: Value) -> Self {
        Self {
            source: ValueSource::inline(value),
            spread: false,
        }
    }

    /// Creates an inline input spread into positional arguments.
    #[must_use]
    pub const fn spread(values: Value) -> Self {
        Self {
            source: ValueSource::inline(values),
            spread: true,
        }
    }

    /// Turns a resolved input value into positional arguments.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` when `spread` is set and the value
    /// is not a sequence.
    pub fn arguments(&self, resolved: Value) -> DomainResult<Vec<Value>> {
        if !self.spread {
            return Ok(vec![resolved]);
        }
        match resolved {
            Value::Array(items) => Ok(items),
            other => Err(DomainError::InvalidInput(format!(
                "spread input must be a sequence, got {other}"
            ))),
        }
    }
}

/// Declared expected output or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Expectation {
    /// Expected value, inline or from a file.
    #[serde(flatten)]
    pub source: ValueSource,
    /// Assertions run against the captured output or error.
    #[serde(default)]
    pub asserts: Vec<Assertion>,
}

impl Expectation {
    /// Creates an inline expectation.
    #[must_use]
    pub const fn inline(value: Value, asserts: Vec<Assertion>) -> Self {
        Self {
            source: ValueSource::inline(value),
            asserts,
        }
    }
}
