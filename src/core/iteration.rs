// src/core/iteration.rs — One attempt at one problem
//
// Produces an IterationRecord from a problem, an iteration index and the
// prior persisted record for that slot. Solved priors are returned as-is;
// other priors that carry a solution are re-evaluated without a new solve.

use std::sync::Arc;

use super::cancel::CancelToken;
use super::types::{IterationRecord, Problem, Tier, TierCounts};
use crate::evaluator::{ExecutionContext, TestTierEvaluator};
use crate::infra::errors::BenchResult;
use crate::provider::SolutionProducer;

#[derive(Clone)]
pub struct IterationRunner {
    producer: Arc<dyn SolutionProducer>,
    evaluator: Arc<dyn TestTierEvaluator>,
    cancel: CancelToken,
}

impl IterationRunner {
    pub fn new(producer: Arc<dyn SolutionProducer>, evaluator: Arc<dyn TestTierEvaluator>) -> Self {
        Self {
            producer,
            evaluator,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the attempt. Only fatal errors are returned; a failed solve or a
    /// broken tier is logged and shows up as zero counts.
    pub async fn run(
        &self,
        problem: &Problem,
        iteration: u32,
        prior: Option<&IterationRecord>,
    ) -> BenchResult<IterationRecord> {
        self.cancel.check()?;

        let mut record = match prior {
            Some(p) if p.is_solved() => {
                tracing::info!(problem = %problem.name, iteration, "Already solved, reusing record");
                return Ok(p.clone());
            }
            Some(p) if !p.is_empty() && p.solution.trim().is_empty() => {
                tracing::info!(problem = %problem.name, iteration, "Prior record has no solution, keeping it");
                return Ok(p.clone());
            }
            Some(p) if !p.is_empty() => {
                tracing::info!(problem = %problem.name, iteration, "Re-evaluating prior solution");
                p.clone()
            }
            _ => match self.fresh_attempt(problem, iteration).await? {
                Some(record) => record,
                None => return Ok(IterationRecord::default()),
            },
        };

        let ctx = ExecutionContext::scoped()?;
        for tier in Tier::ALL {
            let counts = self.evaluate_tier(tier, problem, &record.solution, &ctx).await?;
            record.set_counts(tier, counts);
        }

        tracing::info!(
            problem = %problem.name,
            iteration,
            solved = record.is_solved(),
            "public {}/{}, private {}/{}, generated {}/{}",
            record.passed_public,
            record.counts(Tier::Public).total(),
            record.passed_private,
            record.counts(Tier::Private).total(),
            record.passed_generated,
            record.counts(Tier::Generated).total(),
        );
        Ok(record)
    }

    /// Ask the producer for a candidate. `None` means nothing usable came back.
    async fn fresh_attempt(&self, problem: &Problem, iteration: u32) -> BenchResult<Option<IterationRecord>> {
        let outcome = match self.cancel.guard(self.producer.solve(problem, iteration)).await {
            Ok(o) => o,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(problem = %problem.name, iteration, "Solve failed: {}", e);
                return Ok(None);
            }
        };

        let Some(solution) = outcome.candidate() else {
            tracing::warn!(problem = %problem.name, iteration, "No solution produced");
            return Ok(None);
        };

        Ok(Some(IterationRecord {
            solution: solution.to_string(),
            fixes_via_ai_tests: outcome.fixes_via_ai_tests,
            fixes_via_public_tests: outcome.fixes_via_public_tests,
            ..Default::default()
        }))
    }

    async fn evaluate_tier(
        &self,
        tier: Tier,
        problem: &Problem,
        solution: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<TierCounts> {
        match self
            .cancel
            .guard(self.evaluator.run_tier(tier, problem, solution, ctx))
            .await
        {
            Ok(report) => Ok(report.counts),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::error!(problem = %problem.name, tier = %tier, "Tier evaluation failed: {}", e);
                Ok(TierCounts::default())
            }
        }
    }
}
