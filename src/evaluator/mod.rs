// src/evaluator/mod.rs — Test tier evaluation
//
// The engine only sees the `TestTierEvaluator` trait. `test_runner` supplies
// the default subprocess implementation.

pub mod context;
pub mod test_runner;
pub mod utils;

use async_trait::async_trait;

use crate::core::types::{Problem, TestCase, TestOutcome, Tier, TierCounts};
use crate::infra::errors::BenchResult;
pub use context::ExecutionContext;

/// Outcomes of one evaluation plus their tally.
#[derive(Debug, Clone, Default)]
pub struct TierReport {
    pub outcomes: Vec<TestOutcome>,
    pub counts: TierCounts,
}

impl TierReport {
    pub fn from_outcomes(outcomes: Vec<TestOutcome>) -> Self {
        let counts = TierCounts::tally(&outcomes);
        Self { outcomes, counts }
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed && !o.timed_out)
    }
}

/// Runs a candidate against labelled cases.
///
/// Failing cases are data, never errors. An `Err` means the evaluator itself
/// could not do its job (interpreter missing, crash, unwritable sandbox).
#[async_trait]
pub trait TestTierEvaluator: Send + Sync {
    async fn run_cases(
        &self,
        cases: &[TestCase],
        candidate: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<TierReport>;

    async fn run_tier(
        &self,
        tier: Tier,
        problem: &Problem,
        candidate: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<TierReport> {
        let cases = problem.tier(tier).cases();
        self.run_cases(&cases, candidate, ctx).await
    }
}
