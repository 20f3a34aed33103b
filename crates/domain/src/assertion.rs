//! Assertions applied during the Assert phase.

use serde::{Deserialize, Serialize};

/// One comparison rule: which path to compare, what to omit first, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// Dot path of the compared value on both sides.
    pub compare_key: String,
    /// JSON-parse the raw string at `compare_key` on both sides first.
    #[serde(default)]
    pub parse: bool,
    /// Dot paths removed from both sides before comparing.
    #[serde(default)]
    pub omit_keys: Vec<String>,
    /// Comparison applied as `operator(actual, expected)`.
    pub operator: CompareOperator,
}

impl Assertion {
    /// Creates an assertion without parsing or omissions.
    #[must_use]
    pub fn new(compare_key: impl Into<String>, operator: CompareOperator) -> Self {
        Self {
            compare_key: compare_key.into(),
            parse: false,
            omit_keys: Vec::new(),
            operator,
        }
    }

    /// Adds an omitted path (builder pattern).
    #[must_use]
    pub fn omitting(mut self, key: impl Into<String>) -> Self {
        self.omit_keys.push(key.into());
        self
    }

    /// Enables JSON parsing of the compared values (builder pattern).
    #[must_use]
    pub const fn parsed(mut self) -> Self {
        self.parse = true;
        self
    }

    /// Get a human-readable description of this assertion.
    #[must_use]
    pub fn description(&self) -> String {
        format!("[{}] {}", self.compare_key, self.operator.name())
    }
}

/// Comparison operators, named after the assertion functions they mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOperator {
    /// Loose equality.
    Equal,
    /// Loose inequality.
    NotEqual,
    /// Same JSON type and value.
    StrictEqual,
    /// Negation of `strictEqual`.
    NotStrictEqual,
    /// Structural equality.
    DeepEqual,
    /// Negation of `deepEqual`.
    NotDeepEqual,
    /// Expected value is a regex tested against the actual value.
    Match,
    /// Negation of `match`.
    NotMatch,
    /// actual > expected
    IsAbove,
    /// actual >= expected
    IsAtLeast,
    /// actual < expected
    IsBelow,
    /// actual <= expected
    IsAtMost,
    /// Actual string/array/object contains expected.
    Include,
    /// Negation of `include`.
    NotInclude,
    /// Length of the actual value equals expected.
    LengthOf,
    /// Actual value is present and not null.
    Exists,
    /// Actual value is absent or null.
    NotExists,
}

impl CompareOperator {
    /// The operator name as written in documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::StrictEqual => "strictEqual",
            Self::NotStrictEqual => "notStrictEqual",
            Self::DeepEqual => "deepEqual",
            Self::NotDeepEqual => "notDeepEqual",
            Self::Match => "match",
            Self::NotMatch => "notMatch",
            Self::IsAbove => "isAbove",
            Self::IsAtLeast => "isAtLeast",
            Self::IsBelow => "isBelow",
            Self::IsAtMost => "isAtMost",
            Self::Include => "include",
            Self::NotInclude => "notInclude",
            Self::LengthOf => "lengthOf",
            Self::Exists => "exists",
            Self::NotExists => "notExists",
        }
    }

    /// Every operator, in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Equal,
            Self::NotEqual,
            Self::StrictEqual,
            Self::NotStrictEqual,
            Self::DeepEqual,
            Self::NotDeepEqual,
            Self::Match,
            Self::NotMatch,
            Self::IsAbove,
            Self::IsAtLeast,
            Self::IsBelow,
            Self::IsAtMost,
            Self::Include,
            Self::NotInclude,
            Self::LengthOf,
            Self::Exists,
            Self::NotExists,
        ]
    }
}
