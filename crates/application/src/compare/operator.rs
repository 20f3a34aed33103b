//! Operator semantics.
//!
//! Every operator is applied as `operator(actual, expected)`. A value that is
//! absent at the compared path is `None`, which is distinct from JSON `null`
//! except under loose equality.

use regex::Regex;
use serde_json::Value;
use tapestry_domain::CompareOperator;

use crate::template::to_text;

/// Why an operator rejected a pair of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The values do not satisfy the operator.
    Mismatch(String),
    /// The expected value is not a valid regex.
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// Regex compiler message.
        message: String,
    },
}

/// Applies an operator.
///
/// # Errors
///
/// Returns the reason the values do not satisfy the operator.
pub fn apply(
    operator: CompareOperator,
    actual: Option<&Value>,
    expected: Option<&Value>,
) -> Result<(), Rejection> {
    let holds = match operator {
        CompareOperator::Equal => loose_equal(actual, expected),
        CompareOperator::NotEqual => !loose_equal(actual, expected),
        CompareOperator::StrictEqual => strict_equal(actual, expected),
        CompareOperator::NotStrictEqual => !strict_equal(actual, expected),
        CompareOperator::DeepEqual => optional_deep_equal(actual, expected),
        CompareOperator::NotDeepEqual => !optional_deep_equal(actual, expected),
        CompareOperator::Match => regex_match(actual, expected)?,
        CompareOperator::NotMatch => !regex_match(actual, expected)?,
        CompareOperator::IsAbove => ordered(actual, expected, |a, e| a > e)?,
        CompareOperator::IsAtLeast => ordered(actual, expected, |a, e| a >= e)?,
        CompareOperator::IsBelow => ordered(actual, expected, |a, e| a < e)?,
        CompareOperator::IsAtMost => ordered(actual, expected, |a, e| a <= e)?,
        CompareOperator::Include => includes(actual, expected)?,
        CompareOperator::NotInclude => !includes(actual, expected)?,
        CompareOperator::LengthOf => length_of(actual, expected)?,
        CompareOperator::Exists => actual.is_some_and(|v| !v.is_null()),
        CompareOperator::NotExists => actual.is_none_or(Value::is_null),
    };

    if holds {
        Ok(())
    } else {
        Err(Rejection::Mismatch(format!(
            "expected {} to {} {}",
            describe(actual),
            operator.name(),
            describe(expected)
        )))
    }
}

/// Human-readable form of a possibly absent value.
#[must_use]
pub fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), ToString::to_string)
}

/// Structural equality; numbers compare by value (`1 == 1.0`).
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

fn optional_deep_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => deep_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn strict_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    optional_deep_equal(a, b)
}

/// Loose equality: absent equals null, numeric strings equal numbers,
/// booleans compare as 0/1, composites compare structurally.
fn loose_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => false,
        (Some(a), Some(b)) => match (a, b) {
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                deep_equal(a, b)
            }
            _ => match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn regex_match(actual: Option<&Value>, expected: Option<&Value>) -> Result<bool, Rejection> {
    let pattern = expected.map(to_text).unwrap_or_default();
    let regex = Regex::new(&pattern).map_err(|e| Rejection::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    match actual {
        Some(value) => Ok(regex.is_match(&to_text(value))),
        None => Err(Rejection::Mismatch(format!(
            "expected undefined to match /{pattern}/"
        ))),
    }
}

fn ordered(
    actual: Option<&Value>,
    expected: Option<&Value>,
    holds: impl Fn(f64, f64) -> bool,
) -> Result<bool, Rejection> {
    match (actual.and_then(Value::as_f64), expected.and_then(Value::as_f64)) {
        (Some(a), Some(e)) => Ok(holds(a, e)),
        _ => Err(Rejection::Mismatch(format!(
            "expected numbers, got {} and {}",
            describe(actual),
            describe(expected)
        ))),
    }
}

fn includes(actual: Option<&Value>, expected: Option<&Value>) -> Result<bool, Rejection> {
    match (actual, expected) {
        (Some(Value::String(haystack)), Some(needle)) => Ok(haystack.contains(&to_text(needle))),
        (Some(Value::Array(items)), Some(needle)) => {
            Ok(items.iter().any(|item| deep_equal(item, needle)))
        }
        (Some(Value::Object(map)), Some(Value::Object(subset))) => Ok(subset
            .iter()
            .all(|(k, v)| map.get(k).is_some_and(|actual| deep_equal(actual, v)))),
        _ => Err(Rejection::Mismatch(format!(
            "{} cannot include {}",
            describe(actual),
            describe(expected)
        ))),
    }
}

fn length_of(actual: Option<&Value>, expected: Option<&Value>) -> Result<bool, Rejection> {
    let length = match actual {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(items)) => items.len(),
        other => {
            return Err(Rejection::Mismatch(format!(
                "{} has no length",
                describe(other)
            )));
        }
    };
    match expected.and_then(Value::as_u64) {
        Some(n) => Ok(u64::try_from(length).is_ok_and(|len| len == n)),
        None => Err(Rejection::Mismatch(format!(
            "expected length must be a non-negative integer, got {}",
            describe(expected)
        ))),
    }
}
