// src/provider/staged.rs — Staged solver: draft, public-test repair, AI-test repair
//
// Decorates a base producer. Each `solve` drafts a candidate, repairs it
// against the public examples, then repairs it against the AI-generated
// tests with the public passes carried over as already-satisfied.

use std::sync::Arc;

use async_trait::async_trait;

use super::{clean_solution, SolutionProducer, SolveOutcome};
use crate::core::cancel::CancelToken;
use crate::core::repair::RepairLoop;
use crate::core::types::Problem;
use crate::evaluator::TestTierEvaluator;
use crate::infra::config::RepairConfig;
use crate::infra::errors::BenchResult;

pub struct StagedSolver {
    base: Arc<dyn SolutionProducer>,
    evaluator: Arc<dyn TestTierEvaluator>,
    max_public_calls: u32,
    max_allowed_calls: u32,
    cancel: CancelToken,
}

impl StagedSolver {
    pub fn new(
        base: Arc<dyn SolutionProducer>,
        evaluator: Arc<dyn TestTierEvaluator>,
        config: &RepairConfig,
    ) -> Self {
        Self {
            base,
            evaluator,
            max_public_calls: config.max_public_calls,
            max_allowed_calls: config.max_allowed_calls,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn repair_loop(&self, max_attempts: u32) -> RepairLoop {
        RepairLoop::new(self.evaluator.clone(), self.base.clone(), max_attempts)
            .with_cancel(self.cancel.clone())
    }
}

#[async_trait]
impl SolutionProducer for StagedSolver {
    async fn solve(&self, problem: &Problem, iteration: u32) -> BenchResult<SolveOutcome> {
        let draft = self.base.solve(problem, iteration).await?;
        let Some(candidate) = draft
            .candidate()
            .map(clean_solution)
            .filter(|c| !c.trim().is_empty())
        else {
            return Ok(SolveOutcome::nothing());
        };

        let mut outcome = SolveOutcome::solution(candidate.clone());
        let mut current = candidate;
        let mut seed = Default::default();

        // Stage 1 is skipped when the public budget is zero.
        if self.max_public_calls > 0 {
            let public = self
                .repair_loop(self.max_public_calls)
                .run(problem, &current, &problem.public_as_aux())
                .await?;
            tracing::info!(
                problem = %problem.name,
                iteration,
                "Public repair: {}/{} passing after {} failing round(s), {} fix(es)",
                public.tests_passed,
                public.tests_total,
                public.attempts_used,
                public.fixes_used
            );
            outcome.fixes_via_public_tests = Some(public.attempts_used);
            current = public.solution;
            seed = public.passed_test_inputs;
        }

        // The AI tests include the public ones, so passes carry over.
        let ai = self
            .repair_loop(self.max_allowed_calls)
            .run_seeded(problem, &current, &problem.ai_tests, seed)
            .await?;
        tracing::info!(
            problem = %problem.name,
            iteration,
            "AI-test repair: {}/{} passing after {} failing round(s), {} fix(es)",
            ai.tests_passed,
            ai.tests_total,
            ai.attempts_used,
            ai.fixes_used
        );
        // Failing rounds are counted, including the last one that gets no fix.
        outcome.fixes_via_ai_tests = Some(ai.attempts_used);
        outcome.solution = Some(ai.solution);
        Ok(outcome)
    }

    async fn fix(&self, problem: &Problem, candidate: &str, error_text: &str) -> BenchResult<String> {
        self.base.fix(problem, candidate, error_text).await
    }
}
