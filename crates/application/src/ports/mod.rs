//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the engine and its collaborators.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod harness;
mod loader;
mod schema;
mod signer;
mod transport;

pub use harness::TestHarness;
pub use loader::{LoadError, ResourceLoader};
pub use schema::{AcceptAll, SchemaValidator, SchemaViolation};
pub use signer::{RequestSigner, SigningError};
pub use transport::{OutboundRequest, Transport, TransportError, TransportResponse};
