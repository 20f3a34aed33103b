//! Tapestry Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod persistence;
pub mod schema;
pub mod serialization;
pub mod settings;
pub mod telemetry;
pub mod testing;

pub use adapters::{ReqwestTransport, SigV4Signer};
pub use persistence::FsResourceLoader;
pub use schema::{DOCUMENT_SCHEMA, JsonSchemaValidator, SchemaError};
pub use serialization::{Format, SerializationError};
pub use settings::{SettingsError, load_seed, load_settings};
pub use telemetry::init_tracing;
pub use testing::TokioHarness;
