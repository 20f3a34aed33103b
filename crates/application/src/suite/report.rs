//! Suite and case results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{CaseFailure, CaseOutcome};

/// Final status of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Ran and passed.
    Passed,
    /// Ran and failed.
    Failed,
    /// Not run.
    Skipped,
}

/// Result of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    /// Group the case was registered in (`test: <index>`).
    pub group: String,
    /// Case name.
    pub name: String,
    /// Final status.
    pub status: CaseStatus,
    /// Phase a failed case stopped in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<String>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Compare keys of failed assertions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_keys: Vec<String>,
    /// Number of assertions that ran.
    pub assertions: usize,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CaseReport {
    /// Report for a case that was not run.
    #[must_use]
    pub fn skipped(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            status: CaseStatus::Skipped,
            failed_phase: None,
            message: None,
            failed_keys: Vec::new(),
            assertions: 0,
            duration_ms: 0,
        }
    }

    /// Report for a case that ran.
    #[must_use]
    pub fn from_result(
        group: impl Into<String>,
        name: impl Into<String>,
        result: &Result<CaseOutcome, CaseFailure>,
        elapsed: Duration,
    ) -> Self {
        let mut report = Self::skipped(group, name);
        report.duration_ms = millis(elapsed);
        match result {
            Ok(outcome) => {
                report.status = CaseStatus::Passed;
                report.assertions = outcome.report.total;
            }
            Err(failure) => {
                report.status = CaseStatus::Failed;
                report.failed_phase = Some(failure.phase().to_string());
                report.message = Some(failure.to_string());
                report.failed_keys = failure.failed_keys().into_iter().map(str::to_string).collect();
                if let CaseFailure::Assertions(assertions) = failure {
                    report.assertions = assertions.total;
                }
            }
        }
        report
    }

    /// Whether the case failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == CaseStatus::Failed
    }
}

/// Result of one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite name.
    pub name: String,
    /// Case reports, in registration order.
    pub cases: Vec<CaseReport>,
    /// Passed cases.
    pub passed: usize,
    /// Failed cases.
    pub failed: usize,
    /// Skipped cases.
    pub skipped: usize,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Aggregates case reports.
    #[must_use]
    pub fn new(name: impl Into<String>, cases: Vec<CaseReport>, elapsed: Duration) -> Self {
        let count = |status| cases.iter().filter(|c| c.status == status).count();
        let passed = count(CaseStatus::Passed);
        let failed = count(CaseStatus::Failed);
        let skipped = count(CaseStatus::Skipped);
        Self {
            name: name.into(),
            cases,
            passed,
            failed,
            skipped,
            duration_ms: millis(elapsed),
        }
    }

    /// Whether no case failed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Report of a case by name.
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compare::AssertionReport;
    use crate::invoke::Invocation;
    use crate::lifecycle::Phase;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tapestry_domain::AppError;

    #[test]
    fn test_counts() {
        let passed = Ok(CaseOutcome {
            phase: Phase::Done,
            invocation: Invocation::Returned(Value::Null),
            report: AssertionReport::default(),
            duration: Duration::ZERO,
        });
        let failed = Err(CaseFailure::UnexpectedError(AppError::new("x")));

        let report = SuiteReport::new(
            "unit",
            vec![
                CaseReport::from_result("test: 0", "a", &passed, Duration::from_millis(3)),
                CaseReport::from_result("test: 1", "b", &failed, Duration::ZERO),
                CaseReport::skipped("test: 2", "c"),
            ],
            Duration::from_millis(5),
        );
        assert_eq!((report.passed, report.failed, report.skipped), (1, 1, 1));
        assert!(!report.all_passed());

        let b = report.case("b").unwrap();
        assert_eq!(b.failed_phase.as_deref(), Some("invoke"));
        assert_eq!(b.message.as_deref(), Some("unexpected application error: Error: x"));
        assert_eq!(report.case("a").map(|c| c.duration_ms), Some(3));
    }
}
