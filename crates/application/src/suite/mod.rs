//! Suite building
//!
//! [`SuiteBuilder::build`] validates a whole document against the schema,
//! resolves the application module, and plans one lifecycle-driven case per
//! test. The resulting [`SuitePlan`] is handed to a
//! [`TestHarness`](crate::ports::TestHarness).

mod report;

pub use report::{CaseReport, CaseStatus, SuiteReport};

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tapestry_domain::{CaseMode, SeedContext, Task, TestSpecDocument};
use thiserror::Error;
use tracing::info;

use crate::invoke::{Convention, Handler, ModuleError, ModuleRegistry};
use crate::lifecycle::{CaseFailure, CaseOutcome, RegisteredCase, TestLifecycle};
use crate::ports::{LoadError, ResourceLoader, SchemaValidator, SchemaViolation};

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// An already parsed document.
    Value(Value),
    /// A path loaded through the resource loader.
    Path(String),
}

impl From<Value> for DocumentSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for DocumentSource {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

/// Configuration errors reported before any case runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    /// No document was supplied or found.
    #[error("missing test specification document: {0}")]
    MissingDocument(String),

    /// The document failed schema validation.
    #[error("invalid test specification format:\n{}", format_violations(.0))]
    InvalidFormat(Vec<SchemaViolation>),

    /// The document passed the schema but cannot be deserialised.
    #[error("malformed test specification: {0}")]
    Malformed(String),

    /// The document could not be loaded.
    #[error(transparent)]
    Load(LoadError),

    /// The application module could not be resolved.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// The module's export does not match the invocation strategy.
    #[error("module {module} exports a {handler} handler but the engine uses the {strategy} strategy")]
    ConventionMismatch {
        /// Module path.
        module: String,
        /// Convention of the export.
        handler: Convention,
        /// Convention of the strategy.
        strategy: Convention,
    },
}

impl SuiteError {
    /// Validation errors, when the document failed the schema.
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            Self::InvalidFormat(violations) => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything needed to run one case, detached from the plan.
#[derive(Clone)]
pub struct CaseJob {
    suite: Arc<str>,
    case: Arc<RegisteredCase>,
    handler: Handler,
    seed: Arc<SeedContext>,
    lifecycle: TestLifecycle,
}

impl CaseJob {
    /// Runs the case.
    ///
    /// # Errors
    ///
    /// Returns the case's failure.
    pub async fn run(&self) -> Result<CaseOutcome, CaseFailure> {
        self.lifecycle
            .run(&self.suite, &self.case, &self.handler, &self.seed)
            .await
    }

    /// Whether the case's setup replaces shared services.
    ///
    /// Service slots are process-wide, so a harness running cases
    /// concurrently must not overlap two such cases.
    #[must_use]
    pub fn installs_stubs(&self) -> bool {
        self.case
            .spec()
            .setup_tasks(self.seed.use_mocks)
            .iter()
            .any(|task| matches!(task, Task::Stub(_)))
    }
}

/// One registered case.
#[derive(Clone)]
pub struct PlannedCase {
    /// Group name (`test: <index>`).
    pub group: String,
    /// Case name.
    pub name: String,
    /// How the runner treats the case.
    pub mode: CaseMode,
    /// The runnable case.
    pub job: CaseJob,
}

/// One suite ready for a harness.
#[derive(Clone)]
pub struct SuitePlan {
    /// Suite name: `nameOfTestSuite`, or `unit` / `integration`.
    pub name: String,
    /// Module under test.
    pub module: String,
    /// Cases in document order.
    pub cases: Vec<PlannedCase>,
}

impl SuitePlan {
    /// Whether any case is marked `only`.
    #[must_use]
    pub fn has_only(&self) -> bool {
        self.cases.iter().any(|c| c.mode == CaseMode::Only)
    }

    /// Whether `case` runs: with any `only` case present only those run,
    /// otherwise every case not marked `skip`.
    #[must_use]
    pub fn should_run(&self, case: &PlannedCase) -> bool {
        if self.has_only() {
            case.mode == CaseMode::Only
        } else {
            case.mode != CaseMode::Skip
        }
    }
}

impl std::fmt::Debug for SuitePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuitePlan")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("cases", &self.cases.iter().map(|c| &c.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Builds suite plans from documents.
#[derive(Clone)]
pub struct SuiteBuilder {
    validator: Arc<dyn SchemaValidator>,
    loader: Arc<dyn ResourceLoader>,
    modules: Arc<ModuleRegistry>,
    lifecycle: TestLifecycle,
}

impl SuiteBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        validator: Arc<dyn SchemaValidator>,
        loader: Arc<dyn ResourceLoader>,
        modules: Arc<ModuleRegistry>,
        lifecycle: TestLifecycle,
    ) -> Self {
        Self {
            validator,
            loader,
            modules,
            lifecycle,
        }
    }

    /// Validates, parses and plans a document.
    ///
    /// # Errors
    ///
    /// Returns a [`SuiteError`] when the document is missing, invalid, or
    /// names a module that cannot be resolved. Nothing has run in that case.
    pub async fn build(
        &self,
        source: impl Into<DocumentSource>,
        seed: SeedContext,
    ) -> Result<SuitePlan, SuiteError> {
        let raw = match source.into() {
            DocumentSource::Value(Value::Null) => {
                return Err(SuiteError::MissingDocument("no document supplied".to_string()));
            }
            DocumentSource::Value(value) => value,
            DocumentSource::Path(path) => self.loader.load(&path).await.map_err(|e| match e {
                LoadError::NotFound(missing) => {
                    SuiteError::MissingDocument(missing.display().to_string())
                }
                other => SuiteError::Load(other),
            })?,
        };

        self.validator
            .validate(&raw)
            .map_err(SuiteError::InvalidFormat)?;
        let document: TestSpecDocument =
            serde_json::from_value(raw).map_err(|e| SuiteError::Malformed(e.to_string()))?;

        let handler = self
            .modules
            .resolve(&document.module, document.module_key.as_deref())?;
        let strategy = self.lifecycle.strategy().convention();
        if handler.convention() != strategy {
            return Err(SuiteError::ConventionMismatch {
                module: document.module,
                handler: handler.convention(),
                strategy,
            });
        }

        let name = seed.suite_name().to_string();
        let suite: Arc<str> = Arc::from(name.as_str());
        let seed = Arc::new(seed);
        let cases = document
            .tests
            .into_iter()
            .enumerate()
            .map(|(index, case)| PlannedCase {
                group: format!("test: {index}"),
                name: case.name.clone(),
                mode: case.mode(),
                job: CaseJob {
                    suite: Arc::clone(&suite),
                    case: Arc::new(RegisteredCase::new(case)),
                    handler: handler.clone(),
                    seed: Arc::clone(&seed),
                    lifecycle: self.lifecycle.clone(),
                },
            })
            .collect::<Vec<_>>();

        info!(suite = %name, module = %document.module, cases = cases.len(), "suite planned");
        Ok(SuitePlan {
            name,
            module: document.module,
            cases,
        })
    }
}

/// Runs a plan sequentially in-process, honouring `only` / `skip`.
///
/// Harness adapters add scheduling and isolation on top of this behaviour.
pub async fn run_sequentially(plan: &SuitePlan) -> SuiteReport {
    let started = Instant::now();
    let mut reports = Vec::with_capacity(plan.cases.len());
    for case in &plan.cases {
        if !plan.should_run(case) {
            reports.push(CaseReport::skipped(&case.group, &case.name));
            continue;
        }
        let case_started = Instant::now();
        let result = case.job.run().await;
        reports.push(CaseReport::from_result(
            &case.group,
            &case.name,
            &result,
            case_started.elapsed(),
        ));
    }
    SuiteReport::new(&plan.name, reports, started.elapsed())
}
