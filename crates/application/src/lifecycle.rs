//! Per-case lifecycle
//!
//! Each case moves through `Setup → Invoke → Assert → Teardown → Done`.
//! Failures stop the case in the phase where they happen; mocks and stubs
//! are reset and restored afterwards on every path.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tapestry_domain::{AppError, SeedContext, TestCase, ValueSource};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::compare::{AssertionReport, run_asserts};
use crate::context::Context;
use crate::dispatch::{TaskDispatcher, TaskError};
use crate::invoke::{Handler, Invocation, InvocationError, InvocationStrategy, resolve_arguments};
use crate::ports::{LoadError, ResourceLoader};

/// Lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Running setup tasks.
    Setup,
    /// Calling the application.
    Invoke,
    /// Running assertions.
    Assert,
    /// Running teardown tasks.
    Teardown,
    /// Case complete.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Invoke => "invoke",
            Self::Assert => "assert",
            Self::Teardown => "teardown",
            Self::Done => "done",
        })
    }
}

/// Why a case failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaseFailure {
    /// A setup task failed.
    #[error("setup failed: {0}")]
    Setup(TaskError),

    /// The application could not be invoked.
    #[error("invocation failed: {0}")]
    Invocation(InvocationError),

    /// The application raised an error and none was expected.
    #[error("unexpected application error: {0}")]
    UnexpectedError(AppError),

    /// An error was expected but the application returned normally.
    #[error("expected an application error, but it returned {returned}")]
    MissingExpectedError {
        /// What the application returned.
        returned: Value,
    },

    /// The expectation file could not be loaded.
    #[error("cannot load expectation: {0}")]
    Expectation(LoadError),

    /// At least one assertion failed.
    #[error("{} of {} assertion(s) failed:\n{}", .0.failed, .0.total, .0.failure_summary())]
    Assertions(Box<AssertionReport>),

    /// A teardown task failed.
    #[error("teardown failed: {0}")]
    Teardown(TaskError),

    /// The case panicked.
    #[error("case panicked: {0}")]
    Panicked(String),
}

impl CaseFailure {
    /// Phase in which the case failed.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Setup(_) => Phase::Setup,
            Self::Invocation(_)
            | Self::UnexpectedError(_)
            | Self::MissingExpectedError { .. }
            | Self::Panicked(_) => Phase::Invoke,
            Self::Expectation(_) | Self::Assertions(_) => Phase::Assert,
            Self::Teardown(_) => Phase::Teardown,
        }
    }

    /// Compare keys of failed assertions, if assertions failed.
    #[must_use]
    pub fn failed_keys(&self) -> Vec<&str> {
        match self {
            Self::Assertions(report) => report.failed_keys(),
            _ => Vec::new(),
        }
    }
}

/// A passed case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    /// Last phase reached.
    pub phase: Phase,
    /// What the application produced.
    pub invocation: Invocation,
    /// Assertion results; empty when no expectation was declared.
    pub report: AssertionReport,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// A test case registered for execution, with its expectation cache.
#[derive(Debug)]
pub struct RegisteredCase {
    spec: TestCase,
    expected: OnceCell<Value>,
}

impl RegisteredCase {
    /// Wraps a case.
    #[must_use]
    pub fn new(spec: TestCase) -> Self {
        Self {
            spec,
            expected: OnceCell::new(),
        }
    }

    /// The declarative case.
    #[must_use]
    pub const fn spec(&self) -> &TestCase {
        &self.spec
    }

    /// Case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The expected value of the active expectation. File-backed values are
    /// loaded on first use and cached for the case's lifetime.
    ///
    /// # Errors
    ///
    /// Returns the loader's error for a file that cannot be loaded.
    pub async fn expected_value(
        &self,
        loader: &dyn ResourceLoader,
    ) -> Result<Option<Value>, LoadError> {
        let Some(expectation) = self.spec.expectation() else {
            return Ok(None);
        };
        match &expectation.source {
            ValueSource::Inline { value } => Ok(Some(value.clone())),
            ValueSource::File { file } => self
                .expected
                .get_or_try_init(|| loader.load(file))
                .await
                .map(|value| Some(value.clone())),
        }
    }
}

/// Drives one case through its lifecycle.
#[derive(Clone)]
pub struct TestLifecycle {
    dispatcher: TaskDispatcher,
    strategy: Arc<dyn InvocationStrategy>,
}

impl TestLifecycle {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(dispatcher: TaskDispatcher, strategy: Arc<dyn InvocationStrategy>) -> Self {
        Self {
            dispatcher,
            strategy,
        }
    }

    /// The active invocation strategy.
    #[must_use]
    pub fn strategy(&self) -> &dyn InvocationStrategy {
        self.strategy.as_ref()
    }

    /// Runs one case against a fresh context seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns a [`CaseFailure`] tagged with the phase that failed.
    pub async fn run(
        &self,
        suite: &str,
        case: &RegisteredCase,
        handler: &Handler,
        seed: &SeedContext,
    ) -> Result<CaseOutcome, CaseFailure> {
        let span = info_span!("case", suite = %suite, case = %case.name());
        async move {
            let started = Instant::now();
            let mut context = Context::from_seed(seed);

            let result = self.drive(case, handler, seed.use_mocks, &mut context).await;
            context.release_mocks();
            enter(Phase::Done);

            match result {
                Ok((invocation, report)) => {
                    info!(assertions = report.total, "case passed");
                    Ok(CaseOutcome {
                        phase: Phase::Done,
                        invocation,
                        report,
                        duration: started.elapsed(),
                    })
                }
                Err(failure) => {
                    warn!(phase = %failure.phase(), error = %failure, "case failed");
                    Err(failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        case: &RegisteredCase,
        handler: &Handler,
        use_mocks: bool,
        context: &mut Context,
    ) -> Result<(Invocation, AssertionReport), CaseFailure> {
        let spec = case.spec();
        let loader = self.dispatcher.loader();

        enter(Phase::Setup);
        self.dispatcher
            .setup(context, spec.setup_tasks(use_mocks))
            .await
            .map_err(CaseFailure::Setup)?;

        enter(Phase::Invoke);
        let args = resolve_arguments(spec.input.as_ref(), loader.as_ref())
            .await
            .map_err(CaseFailure::Invocation)?;
        let invocation = self
            .strategy
            .invoke(handler, args)
            .await
            .map_err(CaseFailure::Invocation)?;
        match (&invocation, spec.expects_error()) {
            (Invocation::Raised(error), false) => {
                return Err(CaseFailure::UnexpectedError(error.clone()));
            }
            (Invocation::Returned(value), true) => {
                return Err(CaseFailure::MissingExpectedError {
                    returned: value.clone(),
                });
            }
            _ => {}
        }

        enter(Phase::Assert);
        let expected = case
            .expected_value(loader.as_ref())
            .await
            .map_err(CaseFailure::Expectation)?;
        let report = match (expected, spec.expectation()) {
            (Some(expected), Some(expectation)) => {
                run_asserts(&expected, &invocation.subject(), &expectation.asserts)
            }
            _ => AssertionReport::default(),
        };
        if !report.all_passed() {
            return Err(CaseFailure::Assertions(Box::new(report)));
        }

        enter(Phase::Teardown);
        self.dispatcher
            .teardown(context, &spec.teardown_calls)
            .await
            .map_err(CaseFailure::Teardown)?;

        Ok((invocation, report))
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "entering phase");
}
