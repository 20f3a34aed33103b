//! Stub installation, reset and restoration.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tapestry_domain::{StubCall, StubTask, ValueSource};
use tracing::debug;
use uuid::Uuid;

use super::MockError;
use super::fake::{FakeMethod, FakeService, ScriptedReply};
use super::guard::StubGuard;
use super::registry::ServiceRegistry;
use crate::ports::ResourceLoader;

/// Fake methods of installed classes: class name, then method name.
pub type MockTable = BTreeMap<String, BTreeMap<String, FakeMethod>>;

/// Installed replacements by class name.
pub type StubTable = BTreeMap<String, StubGuard>;

/// Result of installing the stubs of one `stub` task.
#[derive(Debug)]
pub struct InstalledStub {
    /// Replaced class.
    pub class_name: String,
    /// Fake methods, by method name.
    pub fakes: BTreeMap<String, FakeMethod>,
    /// Ownership of the replaced slot.
    pub guard: StubGuard,
}

/// Builds fakes from `stub` tasks and installs them in the service registry.
#[derive(Clone)]
pub struct MockManager {
    registry: ServiceRegistry,
    loader: Arc<dyn ResourceLoader>,
}

impl MockManager {
    /// Creates a manager.
    #[must_use]
    pub fn new(registry: ServiceRegistry, loader: Arc<dyn ResourceLoader>) -> Self {
        Self { registry, loader }
    }

    /// The registry stubs are installed in.
    #[must_use]
    pub const fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Installs a fake for `task.class_name` owned by `owner`.
    ///
    /// Returns `Ok(None)` when `owner` already replaced that class.
    ///
    /// # Errors
    ///
    /// Fails if the class is unknown, held by another owner, or a reply
    /// value cannot be loaded.
    pub async fn install_stubs(
        &self,
        task: &StubTask,
        owner: Uuid,
    ) -> Result<Option<InstalledStub>, MockError> {
        if !self.registry.contains(&task.require_path, &task.class_name) {
            return Err(MockError::UnknownClass {
                module: task.require_path.clone(),
                class: task.class_name.clone(),
            });
        }

        let mut fakes = BTreeMap::new();
        for method in &task.methods {
            let replies = try_join_all(
                method
                    .calls
                    .iter()
                    .map(|call| self.reply(&task.class_name, &method.name, call)),
            )
            .await?;
            fakes.insert(method.name.clone(), FakeMethod::scripted(&method.name, replies));
        }

        let service = FakeService::new(&task.class_name, fakes.clone());
        let Some(guard) =
            self.registry
                .acquire(&task.require_path, &task.class_name, owner, Arc::new(service))?
        else {
            debug!(class = %task.class_name, "stub already installed for this context");
            return Ok(None);
        };

        debug!(
            class = %task.class_name,
            methods = fakes.len(),
            "stubs installed"
        );
        Ok(Some(InstalledStub {
            class_name: task.class_name.clone(),
            fakes,
            guard,
        }))
    }

    async fn reply(
        &self,
        class: &str,
        method: &str,
        call: &StubCall,
    ) -> Result<ScriptedReply, MockError> {
        let value = match &call.source {
            ValueSource::Inline { value } => value.clone(),
            ValueSource::File { file } => self.loader.load(file).await?,
        };
        let payload = if call.spread {
            match value {
                Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
                other => {
                    return Err(MockError::InvalidReply {
                        class: class.to_string(),
                        method: method.to_string(),
                        message: format!("spread reply must be a sequence, got {other}"),
                    });
                }
            }
        } else {
            value
        };
        Ok(ScriptedReply::new(call.stub_method, payload))
    }
}

/// Clears call history and scripts of every fake. Installed replacements
/// stay in place.
pub fn reset_mocks(mocks: &MockTable) {
    for (class, methods) in mocks {
        for fake in methods.values() {
            fake.reset();
        }
        debug!(%class, methods = methods.len(), "mocks reset");
    }
}

/// Puts back the real implementation of every replaced class.
/// Safe to call repeatedly.
pub fn restore_services(stubs: &mut StubTable) {
    for (class, guard) in stubs.iter_mut() {
        if guard.is_active() {
            guard.restore();
            debug!(%class, "stub restored");
        }
    }
}
