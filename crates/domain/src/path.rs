//! Dot-separated key paths (`meta.timestamp`, `items.0.id`)
//!
//! Used by assertions to address `compareKey` and `omitKeys` inside JSON values.
//! Numeric segments index into arrays.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// A parsed dot path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    raw: String,
    segments: Vec<String>,
}

impl KeyPath {
    /// Parses a dot path.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPath` for an empty path or an empty segment (`a..b`).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if raw.is_empty() || segments.iter().any(String::is_empty) {
            return Err(DomainError::InvalidPath(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Drills down to the value at this path.
    #[must_use]
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        drill(root, &self.segments)
    }

    /// Drills down to the value at this path, mutably.
    #[must_use]
    pub fn get_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        drill_mut(root, &self.segments)
    }

    /// Deletes the final segment's key under its immediate parent.
    ///
    /// A one-segment path deletes a top-level key. When the parent does not
    /// exist the omission is skipped and `None` is returned.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let (last, parent_path) = self.segments.split_last()?;
        let parent = drill_mut(root, parent_path)?;
        match parent {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let index = last.parse::<usize>().ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }
}

fn drill<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn drill_mut<'a>(root: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for KeyPath {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Self::parse(s)
    }
}
