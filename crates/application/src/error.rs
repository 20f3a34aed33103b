//! Application error types

use tapestry_domain::DomainError;
use thiserror::Error;

use crate::compare::CompareError;
use crate::dispatch::TaskError;
use crate::invoke::{InvocationError, ModuleError};
use crate::lifecycle::CaseFailure;
use crate::mock::MockError;
use crate::ports::LoadError;
use crate::suite::SuiteError;
use crate::template::TemplateError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A template could not be rendered.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// An assertion could not be evaluated or did not hold.
    #[error(transparent)]
    Compare(#[from] CompareError),

    /// A setup or teardown task failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Service stubs could not be installed.
    #[error(transparent)]
    Mock(#[from] MockError),

    /// The application could not be invoked.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// The application module could not be resolved.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// A test case failed.
    #[error("test case failed: {0}")]
    Case(#[from] CaseFailure),

    /// The suite could not be built.
    #[error(transparent)]
    Suite(#[from] SuiteError),

    /// A resource could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
