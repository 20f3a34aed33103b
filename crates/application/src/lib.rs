//! Tapestry Application - Test execution engine
//!
//! This crate drives declarative test cases through their lifecycle:
//! template rendering, setup tasks, service stubs, invocation of the
//! application under test, assertions and teardown. I/O lives behind the
//! traits in [`ports`].

pub mod compare;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod lifecycle;
pub mod mock;
pub mod ports;
pub mod suite;
pub mod template;

pub use compare::{AssertionOutcome, AssertionReport, CompareError, compare, run_asserts};
pub use context::{Context, ContextSnapshot};
pub use dispatch::{TaskDispatcher, TaskEffect, TaskError};
pub use error::{ApplicationError, ApplicationResult};
pub use invoke::{
    Callback, CallbackStrategy, Convention, DirectStrategy, Handler, Invocation, InvocationError,
    InvocationStrategy, ModuleError, ModuleRegistry,
};
pub use lifecycle::{CaseFailure, CaseOutcome, Phase, RegisteredCase, TestLifecycle};
pub use mock::{
    FakeMethod, FakeService, MethodTable, MockError, MockManager, Service, ServiceRegistry,
    StubGuard,
};
pub use ports::{
    LoadError, OutboundRequest, RequestSigner, ResourceLoader, SchemaValidator, SchemaViolation,
    SigningError, TestHarness, Transport, TransportError, TransportResponse,
};
pub use suite::{
    CaseReport, CaseStatus, DocumentSource, SuiteBuilder, SuiteError, SuitePlan, SuiteReport,
    run_sequentially,
};
pub use template::{Template, TemplateError, render};
