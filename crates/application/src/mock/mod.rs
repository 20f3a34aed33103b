//! Mock lifecycle management
//!
//! `stub` tasks replace a collaborator class with a [`FakeService`] whose
//! methods replay scripted replies. Replacements are owned by the context
//! that installed them through a [`StubGuard`]; [`reset_mocks`] and
//! [`restore_services`] run after every case so no fake outlives it.

mod fake;
mod guard;
mod manager;
mod registry;
mod service;

pub use fake::{FakeMethod, FakeService, ScriptedReply};
pub use guard::StubGuard;
pub use manager::{InstalledStub, MockManager, MockTable, StubTable, reset_mocks, restore_services};
pub use registry::{ServiceRegistry, SlotKey, module_id};
pub use service::{MethodTable, Service};

use thiserror::Error;

use crate::ports::LoadError;

/// Errors raised while installing stubs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// The class is not registered under the module path.
    #[error("class {class} not found in module {module}")]
    UnknownClass {
        /// Module path.
        module: String,
        /// Class name.
        class: String,
    },

    /// Another context holds the class's slot.
    #[error("service {class} is already stubbed by another test case")]
    SlotBusy {
        /// Class name.
        class: String,
    },

    /// A reply value has the wrong shape.
    #[error("invalid reply for {class}.{method}: {message}")]
    InvalidReply {
        /// Class name.
        class: String,
        /// Method name.
        method: String,
        /// What was wrong.
        message: String,
    },

    /// A reply file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}
