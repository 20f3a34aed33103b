//! Tapestry Domain - Test specification data model
//!
//! This crate defines the declarative shape of a test-specification
//! document: test cases, setup tasks, expectations and assertions.
//! All types here are pure Rust with no I/O dependencies.

pub mod app_error;
pub mod assertion;
pub mod document;
pub mod error;
pub mod method;
pub mod path;
pub mod seed;
pub mod source;
pub mod task;

pub use app_error::AppError;
pub use assertion::{Assertion, CompareOperator};
pub use document::{CaseMode, Expectation, InputSpec, TestCase, TestSpecDocument};
pub use error::{DomainError, DomainResult};
pub use method::HttpMethod;
pub use path::KeyPath;
pub use seed::{EngineSettings, SeedContext};
pub use source::ValueSource;
pub use task::{
    AuthKind, HttpTask, RequireTask, StubBehavior, StubCall, StubMethodSpec, StubTask, Task,
};
