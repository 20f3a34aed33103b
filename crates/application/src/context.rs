//! Per-case context
//!
//! Each test case owns one [`Context`], seeded from a clone of the caller's
//! seed (stored under `config`). Setup tasks add one entry per `contextKey`;
//! `stub` tasks add fakes to `mocks` and guards to `stubs`. The context is
//! discarded when the case is done.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tapestry_domain::SeedContext;
use tracing::warn;
use uuid::Uuid;

use crate::mock::{FakeMethod, InstalledStub, MockTable, StubTable, reset_mocks, restore_services};

/// Key holding the seed object.
pub const CONFIG_KEY: &str = "config";

/// Mutable per-case data bag.
#[derive(Debug)]
pub struct Context {
    id: Uuid,
    values: Map<String, Value>,
    mocks: MockTable,
    stubs: StubTable,
}

impl Context {
    /// Creates a context whose `config` is a copy of `seed`.
    #[must_use]
    pub fn from_seed(seed: &SeedContext) -> Self {
        let mut values = Map::new();
        values.insert(CONFIG_KEY.to_string(), seed.to_config());
        Self {
            id: Uuid::now_v7(),
            values,
            mocks: MockTable::new(),
            stubs: StubTable::new(),
        }
    }

    /// Identity used as the owner of installed stubs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The seed object.
    #[must_use]
    pub fn config(&self) -> &Value {
        self.values.get(CONFIG_KEY).unwrap_or(&Value::Null)
    }

    /// A stored entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Every stored entry, `config` included.
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Fakes of installed classes.
    #[must_use]
    pub const fn mocks(&self) -> &MockTable {
        &self.mocks
    }

    /// Installed replacements.
    #[must_use]
    pub const fn stubs(&self) -> &StubTable {
        &self.stubs
    }

    /// One fake method.
    #[must_use]
    pub fn fake(&self, class: &str, method: &str) -> Option<&FakeMethod> {
        self.mocks.get(class)?.get(method)
    }

    /// Whether a class has been replaced in this context.
    #[must_use]
    pub fn has_stub(&self, class: &str) -> bool {
        self.stubs.contains_key(class)
    }

    /// Records an installed stub under `mocks` and `stubs`.
    pub fn record_stub(&mut self, installed: InstalledStub) {
        let InstalledStub {
            class_name,
            fakes,
            guard,
        } = installed;
        if self.stubs.contains_key(&class_name) {
            warn!(class = %class_name, "class stubbed twice in one context; keeping the first");
            return;
        }
        self.mocks.insert(class_name.clone(), fakes);
        self.stubs.insert(class_name, guard);
    }

    /// Resets every fake and restores every replaced class.
    pub fn release_mocks(&mut self) {
        reset_mocks(&self.mocks);
        restore_services(&mut self.stubs);
    }

    /// Read-only view handed to concurrently running tasks.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            owner: self.id,
            scope: Value::Object(self.values.clone()),
            stubbed: self.stubs.keys().cloned().collect(),
        }
    }
}

/// The context as it was when a phase started.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    owner: Uuid,
    scope: Value,
    stubbed: BTreeSet<String>,
}

impl ContextSnapshot {
    /// Owner identity of the context.
    #[must_use]
    pub const fn owner(&self) -> Uuid {
        self.owner
    }

    /// Template scope: every stored entry as one object.
    #[must_use]
    pub const fn scope(&self) -> &Value {
        &self.scope
    }

    /// The seed object.
    #[must_use]
    pub fn config(&self) -> &Value {
        self.scope.get(CONFIG_KEY).unwrap_or(&Value::Null)
    }

    /// Whether a class was already replaced when the phase started.
    #[must_use]
    pub fn has_stub(&self, class: &str) -> bool {
        self.stubbed.contains(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_seed_is_copied_into_config() {
        let seed = SeedContext::unit().with_value("host", json!("localhost"));
        let mut context = Context::from_seed(&seed);

        assert_eq!(context.config()["host"], json!("localhost"));
        assert_eq!(context.config()["useMocks"], json!(true));

        context.insert("seed", json!({"a": 1}));
        let snapshot = context.snapshot();
        assert_eq!(snapshot.scope()["seed"]["a"], json!(1));
        assert_eq!(snapshot.config()["host"], json!("localhost"));
        assert_eq!(snapshot.owner(), context.id());
    }

    #[test]
    fn test_contexts_do_not_share_state() {
        let seed = SeedContext::default();
        let mut first = Context::from_seed(&seed);
        let second = Context::from_seed(&seed);

        first.insert("x", json!(1));
        assert!(second.get("x").is_none());
        assert_ne!(first.id(), second.id());
    }
}
