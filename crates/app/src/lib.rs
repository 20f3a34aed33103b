//! Tapestry - declarative, data-driven test execution
//!
//! A test-specification document names an application module and a list of
//! test cases. Each case declares setup tasks (resource loads, HTTP calls,
//! service stubs), the input to call the application with, and the expected
//! output or error with the assertions to check.
//!
//! ```no_run
//! use tapestry::{Engine, Handler, SeedContext};
//!
//! # async fn example() -> Result<(), tapestry::EngineError> {
//! let engine = Engine::builder()
//!     .module("./src/handler", Handler::direct(|args| async move {
//!         Ok(args.into_iter().next().unwrap_or_default())
//!     }))
//!     .build()?;
//!
//! let report = engine
//!     .run_document("./spec/handler.json", SeedContext::unit())
//!     .await?;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

mod engine;

pub use engine::{Engine, EngineBuilder, EngineError, EngineResult};

pub use tapestry_application::{
    Callback, CaseReport, CaseStatus, Convention, DocumentSource, Handler, MethodTable,
    ServiceRegistry, SuitePlan, SuiteReport, TestHarness,
};
pub use tapestry_domain::{AppError, EngineSettings, SeedContext, TestSpecDocument};
pub use tapestry_infrastructure::{TokioHarness, init_tracing, load_seed, load_settings};
