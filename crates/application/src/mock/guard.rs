//! Ownership of an installed replacement.

use uuid::Uuid;

use super::registry::{ServiceRegistry, SlotKey};

/// Holds one service slot for one context.
///
/// The real implementation is restored on [`StubGuard::restore`] or
/// when the guard is dropped, whichever comes first.
#[derive(Debug)]
pub struct StubGuard {
    registry: ServiceRegistry,
    key: SlotKey,
    owner: Uuid,
    released: bool,
}

impl StubGuard {
    pub(super) const fn new(registry: ServiceRegistry, key: SlotKey, owner: Uuid) -> Self {
        Self {
            registry,
            key,
            owner,
            released: false,
        }
    }

    /// The slot held.
    #[must_use]
    pub const fn slot(&self) -> &SlotKey {
        &self.key
    }

    /// Whether the replacement is still installed by this guard.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.released
    }

    /// Restores the real implementation. Repeated calls are no-ops.
    pub fn restore(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(&self.key, self.owner);
        }
    }
}

impl Drop for StubGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
