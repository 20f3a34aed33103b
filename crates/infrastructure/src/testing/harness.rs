//! Tokio-based runner harness.
//!
//! Runs registered suites in order. Within a suite, cases run with bounded
//! concurrency, each on its own task so a panicking case fails alone. Cases
//! that stub services never overlap each other.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tapestry_application::lifecycle::CaseFailure;
use tapestry_application::ports::TestHarness;
use tapestry_application::suite::{CaseReport, PlannedCase, SuitePlan, SuiteReport};
use tapestry_domain::EngineSettings;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Harness executing cases on the tokio runtime.
#[derive(Debug)]
pub struct TokioHarness {
    plans: Vec<SuitePlan>,
    max_concurrency: usize,
    stop_on_first_failure: bool,
}

impl Default for TokioHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioHarness {
    /// Creates a sequential harness.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plans: Vec::new(),
            max_concurrency: 1,
            stop_on_first_failure: false,
        }
    }

    /// Creates a harness from engine settings.
    #[must_use]
    pub const fn from_settings(settings: &EngineSettings) -> Self {
        Self::new()
            .with_max_concurrency(settings.max_concurrency)
            .with_stop_on_first_failure(settings.stop_on_first_failure)
    }

    /// Sets how many cases of one suite may run at once (at least one).
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = if max == 0 { 1 } else { max };
        self
    }

    /// Set whether to stop on first failure.
    ///
    /// Cases not yet started are reported as skipped.
    #[must_use]
    pub const fn with_stop_on_first_failure(mut self, stop: bool) -> Self {
        self.stop_on_first_failure = stop;
        self
    }

    /// Number of registered suites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether no suite is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    async fn run_plan(&self, plan: &SuitePlan) -> SuiteReport {
        let started = Instant::now();
        let halted = Arc::new(AtomicBool::new(false));
        let stubs = Arc::new(Mutex::new(()));
        let stop_on_failure = self.stop_on_first_failure;

        let owned: Vec<(PlannedCase, bool)> = plan
            .cases
            .iter()
            .map(|case| (case.clone(), plan.should_run(case)))
            .collect();

        let cases = stream::iter(owned)
            .map(move |(case, runnable)| {
                let halted = Arc::clone(&halted);
                let stubs = Arc::clone(&stubs);
                async move {
                    if !runnable || halted.load(Ordering::SeqCst) {
                        return CaseReport::skipped(&case.group, &case.name);
                    }
                    // Service slots are shared: stubbing cases take turns.
                    let _turn = if case.job.installs_stubs() {
                        Some(stubs.lock().await)
                    } else {
                        None
                    };
                    if halted.load(Ordering::SeqCst) {
                        return CaseReport::skipped(&case.group, &case.name);
                    }
                    let report = run_isolated(&case).await;
                    if stop_on_failure && report.is_failed() {
                        halted.store(true, Ordering::SeqCst);
                    }
                    report
                }
            })
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = SuiteReport::new(&plan.name, cases, started.elapsed());
        info!(
            suite = %report.name,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "suite finished"
        );
        report
    }
}

async fn run_isolated(case: &PlannedCase) -> CaseReport {
    let job = case.job.clone();
    let started = Instant::now();
    let result = match tokio::spawn(async move { job.run().await }).await {
        Ok(result) => result,
        Err(join_error) => {
            let message = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                "case task was cancelled".to_string()
            };
            warn!(case = %case.name, %message, "case aborted");
            Err(CaseFailure::Panicked(message))
        }
    };
    CaseReport::from_result(&case.group, &case.name, &result, started.elapsed())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "case panicked".to_string())
}

#[async_trait]
impl TestHarness for TokioHarness {
    fn register(&mut self, plan: SuitePlan) {
        self.plans.push(plan);
    }

    async fn run(&mut self) -> Vec<SuiteReport> {
        let plans = std::mem::take(&mut self.plans);
        let mut reports = Vec::with_capacity(plans.len());
        for plan in &plans {
            reports.push(self.run_plan(plan).await);
        }
        reports
    }
}
