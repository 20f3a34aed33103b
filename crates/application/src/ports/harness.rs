//! Runner harness port

use async_trait::async_trait;

use crate::suite::{SuitePlan, SuiteReport};

/// Port for the runner that groups and executes registered cases.
///
/// Implementations honour each case's [`CaseMode`](tapestry_domain::CaseMode)
/// and decide how cases are scheduled.
#[async_trait]
pub trait TestHarness: Send {
    /// Registers one suite.
    fn register(&mut self, plan: SuitePlan);

    /// Runs every registered suite, returning one report per suite in
    /// registration order.
    async fn run(&mut self) -> Vec<SuiteReport>;
}
