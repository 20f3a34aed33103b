//! Assertion results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tapestry_domain::Assertion;

/// Result of running a single assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    /// The assertion that was run.
    pub assertion: Assertion,
    /// Whether the assertion passed.
    pub passed: bool,
    /// Actual value found at the compared path (for display).
    pub actual: Option<Value>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl AssertionOutcome {
    /// Create a passed outcome.
    #[must_use]
    pub const fn pass(assertion: Assertion, actual: Option<Value>) -> Self {
        Self {
            assertion,
            passed: true,
            actual,
            error: None,
        }
    }

    /// Create a failed outcome.
    #[must_use]
    pub fn fail(assertion: Assertion, actual: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            assertion,
            passed: false,
            actual,
            error: Some(error.into()),
        }
    }
}

/// Results of every assertion of one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssertionReport {
    /// Individual outcomes, in declaration order.
    pub outcomes: Vec<AssertionOutcome>,
    /// Total number of assertions.
    pub total: usize,
    /// Number of passed assertions.
    pub passed: usize,
    /// Number of failed assertions.
    pub failed: usize,
}

impl AssertionReport {
    /// Create a report from outcomes.
    #[must_use]
    pub fn new(outcomes: Vec<AssertionOutcome>) -> Self {
        let total = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed).count();
        Self {
            outcomes,
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Check if all assertions passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed outcomes only.
    pub fn failures(&self) -> impl Iterator<Item = &AssertionOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Compare keys of the failed assertions.
    #[must_use]
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures()
            .map(|o| o.assertion.compare_key.as_str())
            .collect()
    }

    /// One line per failure.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        self.failures()
            .filter_map(|o| o.error.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
