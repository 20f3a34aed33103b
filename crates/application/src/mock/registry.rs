//! Shared service slots
//!
//! Every collaborator class lives in a slot keyed by module path and class
//! name. A slot holds the real implementation, the active one, and the
//! context currently owning a replacement. Ownership is taken with
//! [`ServiceRegistry::acquire`] and released through the returned
//! [`StubGuard`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tapestry_domain::AppError;
use tracing::debug;
use uuid::Uuid;

use super::MockError;
use super::guard::StubGuard;
use super::service::Service;

/// Canonical form of a module path: surrounding whitespace, leading `./`
/// and trailing `/` are dropped.
#[must_use]
pub fn module_id(path: &str) -> String {
    let mut id = path.trim();
    while let Some(rest) = id.strip_prefix("./") {
        id = rest;
    }
    id.trim_end_matches('/').to_string()
}

/// Identity of one service slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    module: String,
    class: String,
}

impl SlotKey {
    /// Creates a key; the module path is canonicalised.
    #[must_use]
    pub fn new(module: &str, class: impl Into<String>) -> Self {
        Self {
            module: module_id(module),
            class: class.into(),
        }
    }

    /// Canonical module path.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.class)
    }
}

struct Slot {
    original: Arc<dyn Service>,
    active: Arc<dyn Service>,
    owner: Option<Uuid>,
}

/// Registry of collaborator services, cheap to clone and shared between
/// the engine and the application under test.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    slots: Arc<Mutex<HashMap<SlotKey, Slot>>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the real implementation of a class, replacing any
    /// previous registration.
    pub fn register(&self, module: &str, class: impl Into<String>, service: impl Service + 'static) {
        self.register_shared(module, class, Arc::new(service));
    }

    /// Registers an already shared implementation.
    pub fn register_shared(&self, module: &str, class: impl Into<String>, service: Arc<dyn Service>) {
        let key = SlotKey::new(module, class);
        debug!(slot = %key, "service registered");
        self.lock().insert(
            key,
            Slot {
                original: Arc::clone(&service),
                active: service,
                owner: None,
            },
        );
    }

    /// Whether a class is registered.
    #[must_use]
    pub fn contains(&self, module: &str, class: &str) -> bool {
        self.lock().contains_key(&SlotKey::new(module, class))
    }

    /// The implementation currently active for a class.
    #[must_use]
    pub fn resolve(&self, module: &str, class: &str) -> Option<Arc<dyn Service>> {
        self.lock()
            .get(&SlotKey::new(module, class))
            .map(|slot| Arc::clone(&slot.active))
    }

    /// Whether a class currently has a replacement installed.
    #[must_use]
    pub fn is_stubbed(&self, module: &str, class: &str) -> bool {
        self.lock()
            .get(&SlotKey::new(module, class))
            .is_some_and(|slot| slot.owner.is_some())
    }

    /// Calls a method on the active implementation of a class.
    ///
    /// # Errors
    ///
    /// Returns the method's error, or a `ReferenceError` when the class is
    /// not registered.
    pub async fn call(
        &self,
        module: &str,
        class: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, AppError> {
        let Some(service) = self.resolve(module, class) else {
            return Err(AppError::new(format!("{class} is not defined in {}", module_id(module)))
                .with_name("ReferenceError"));
        };
        service.call(method, args).await
    }

    /// Installs `replacement` for a class on behalf of `owner`.
    ///
    /// Returns `Ok(None)` when `owner` already holds the slot.
    ///
    /// # Errors
    ///
    /// Returns `MockError::UnknownClass` if the class is not registered and
    /// `MockError::SlotBusy` if another owner holds the slot.
    pub fn acquire(
        &self,
        module: &str,
        class: &str,
        owner: Uuid,
        replacement: Arc<dyn Service>,
    ) -> Result<Option<StubGuard>, MockError> {
        let key = SlotKey::new(module, class);
        let mut slots = self.lock();
        let slot = slots.get_mut(&key).ok_or_else(|| MockError::UnknownClass {
            module: key.module().to_string(),
            class: key.class().to_string(),
        })?;

        match slot.owner {
            Some(current) if current == owner => return Ok(None),
            Some(_) => {
                return Err(MockError::SlotBusy {
                    class: key.class().to_string(),
                });
            }
            None => {}
        }

        slot.active = replacement;
        slot.owner = Some(owner);
        drop(slots);
        debug!(slot = %key, %owner, "stub installed");
        Ok(Some(StubGuard::new(self.clone(), key, owner)))
    }

    /// Puts the real implementation back if `owner` holds the slot.
    pub(super) fn release(&self, key: &SlotKey, owner: Uuid) -> bool {
        let released = match self.lock().get_mut(key) {
            Some(slot) if slot.owner == Some(owner) => {
                slot.active = Arc::clone(&slot.original);
                slot.owner = None;
                true
            }
            _ => false,
        };
        if released {
            debug!(slot = %key, %owner, "service restored");
        }
        released
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SlotKey, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.lock().keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("ServiceRegistry").field("slots", &keys).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MethodTable;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> ServiceRegistry {
        let registry = ServiceRegistry::new();
        registry.register(
            "./src/services/user",
            "UserService",
            MethodTable::new().with_method("find", |_| async { Ok(json!("real")) }),
        );
        registry
    }

    fn fake() -> Arc<dyn Service> {
        Arc::new(MethodTable::new().with_method("find", |_| async { Ok(json!("fake")) }))
    }

    #[test]
    fn test_module_id() {
        assert_eq!(module_id("./src/app"), "src/app");
        assert_eq!(module_id(" src/app/ "), "src/app");
        assert_eq!(module_id("././x"), "x");
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let registry = registry();
        let owner = Uuid::now_v7();

        let mut guard = registry
            .acquire("src/services/user", "UserService", owner, fake())
            .unwrap()
            .unwrap();
        assert!(registry.is_stubbed("src/services/user", "UserService"));
        assert_eq!(
            registry.call("src/services/user", "UserService", "find", vec![]).await.unwrap(),
            json!("fake")
        );

        guard.restore();
        assert!(!registry.is_stubbed("src/services/user", "UserService"));
        assert_eq!(
            registry.call("./src/services/user", "UserService", "find", vec![]).await.unwrap(),
            json!("real")
        );
    }

    #[test]
    fn test_same_owner_is_idempotent() {
        let registry = registry();
        let owner = Uuid::now_v7();
        let _guard = registry
            .acquire("src/services/user", "UserService", owner, fake())
            .unwrap();
        let again = registry
            .acquire("src/services/user", "UserService", owner, fake())
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_other_owner_is_refused() {
        let registry = registry();
        let _guard = registry
            .acquire("src/services/user", "UserService", Uuid::now_v7(), fake())
            .unwrap();
        let err = registry
            .acquire("src/services/user", "UserService", Uuid::now_v7(), fake())
            .unwrap_err();
        assert_eq!(
            err,
            MockError::SlotBusy {
                class: "UserService".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_class() {
        let err = registry()
            .acquire("src/services/user", "Nope", Uuid::now_v7(), fake())
            .unwrap_err();
        assert!(matches!(err, MockError::UnknownClass { .. }));
    }

    #[tokio::test]
    async fn test_call_unregistered_class() {
        let err = ServiceRegistry::new()
            .call("m", "C", "f", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.name, "ReferenceError");
    }
}
