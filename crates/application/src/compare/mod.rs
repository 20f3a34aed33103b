//! Path-based deep comparison.
//!
//! One [`Assertion`] is resolved in a fixed order: optional JSON parsing of
//! the value at `compareKey`, removal of every `omitKeys` path from both
//! sides, extraction of the compared values, and finally the operator.
//! Each assertion works on private copies of both roots.

mod operator;
mod report;

pub use operator::{Rejection, apply, deep_equal, describe};
pub use report::{AssertionOutcome, AssertionReport};

use serde_json::Value;
use tapestry_domain::{Assertion, CompareOperator, KeyPath};
use thiserror::Error;
use tracing::debug;

/// Which side of a comparison a problem was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The declared expected value.
    Expected,
    /// The value produced by the application.
    Actual,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Expected => "expected",
            Self::Actual => "actual",
        })
    }
}

/// A failed assertion. Every variant names the offending `compareKey`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    /// `compareKey` or an `omitKeys` entry is not a valid dot path.
    #[error("compare failed for key [{compare_key}]: invalid path {path:?}")]
    InvalidPath {
        /// Compare key of the assertion.
        compare_key: String,
        /// The offending path.
        path: String,
    },

    /// `parse` was requested but the value is not valid JSON.
    #[error("compare failed for key [{compare_key}]: cannot parse {side} value: {message}")]
    Parse {
        /// Compare key of the assertion.
        compare_key: String,
        /// Side holding the bad value.
        side: Side,
        /// Parser message.
        message: String,
    },

    /// The expected value of a `match` assertion is not a valid regex.
    #[error("compare failed for key [{compare_key}]: invalid pattern /{pattern}/: {message}")]
    InvalidPattern {
        /// Compare key of the assertion.
        compare_key: String,
        /// The pattern text.
        pattern: String,
        /// Regex compiler message.
        message: String,
    },

    /// The values do not satisfy the operator.
    #[error("compare failed for key [{compare_key}]: {message}")]
    Mismatch {
        /// Compare key of the assertion.
        compare_key: String,
        /// Operator applied.
        operator: CompareOperator,
        /// What differed.
        message: String,
    },
}

impl CompareError {
    /// The `compareKey` of the failed assertion.
    #[must_use]
    pub fn compare_key(&self) -> &str {
        match self {
            Self::InvalidPath { compare_key, .. }
            | Self::Parse { compare_key, .. }
            | Self::InvalidPattern { compare_key, .. }
            | Self::Mismatch { compare_key, .. } => compare_key,
        }
    }
}

/// Runs one assertion against an expected and an actual root.
///
/// # Errors
///
/// Returns a [`CompareError`] naming `assertion.compare_key` when the
/// assertion does not hold.
pub fn compare(
    expected_root: &Value,
    actual_root: &Value,
    assertion: &Assertion,
) -> Result<(), CompareError> {
    let compare_key = assertion.compare_key.as_str();
    let key = parse_path(compare_key, compare_key)?;

    let mut expected = expected_root.clone();
    let mut actual = actual_root.clone();

    if assertion.parse {
        parse_in_place(&key, &mut expected, Side::Expected, compare_key)?;
        parse_in_place(&key, &mut actual, Side::Actual, compare_key)?;
    }

    for omit in &assertion.omit_keys {
        let path = parse_path(compare_key, omit)?;
        path.remove(&mut expected);
        path.remove(&mut actual);
    }

    let expected_value = key.get(&expected);
    let actual_value = key.get(&actual);
    debug!(
        compare_key,
        operator = assertion.operator.name(),
        actual = %describe(actual_value),
        expected = %describe(expected_value),
        "comparing"
    );

    apply(assertion.operator, actual_value, expected_value).map_err(|rejection| match rejection {
        Rejection::Mismatch(message) => CompareError::Mismatch {
            compare_key: compare_key.to_string(),
            operator: assertion.operator,
            message,
        },
        Rejection::InvalidPattern { pattern, message } => CompareError::InvalidPattern {
            compare_key: compare_key.to_string(),
            pattern,
            message,
        },
    })
}

/// Runs every assertion and collects the outcomes.
///
/// A failing assertion does not stop its siblings.
#[must_use]
pub fn run_asserts(expected: &Value, actual: &Value, asserts: &[Assertion]) -> AssertionReport {
    let outcomes = asserts
        .iter()
        .map(|assertion| {
            let found = KeyPath::parse(&assertion.compare_key)
                .ok()
                .and_then(|key| key.get(actual).cloned());
            match compare(expected, actual, assertion) {
                Ok(()) => AssertionOutcome::pass(assertion.clone(), found),
                Err(e) => AssertionOutcome::fail(assertion.clone(), found, e.to_string()),
            }
        })
        .collect();
    AssertionReport::new(outcomes)
}

fn parse_path(compare_key: &str, raw: &str) -> Result<KeyPath, CompareError> {
    KeyPath::parse(raw).map_err(|_| CompareError::InvalidPath {
        compare_key: compare_key.to_string(),
        path: raw.to_string(),
    })
}

/// Replaces the string at `key` with its parsed JSON. Values that are
/// already structured are left as they are.
fn parse_in_place(
    key: &KeyPath,
    root: &mut Value,
    side: Side,
    compare_key: &str,
) -> Result<(), CompareError> {
    let parse_error = |message: String| CompareError::Parse {
        compare_key: compare_key.to_string(),
        side,
        message,
    };
    match key.get_mut(root) {
        Some(slot @ Value::String(_)) => {
            let parsed = match &*slot {
                Value::String(raw) => serde_json::from_str(raw).map_err(|e| parse_error(e.to_string()))?,
                _ => return Ok(()),
            };
            *slot = parsed;
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(parse_error("no value at this key".to_string())),
    }
}
