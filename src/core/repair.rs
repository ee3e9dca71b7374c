// src/core/repair.rs — Bounded self-repair loop
//
// Reconciles a mutating candidate against an auxiliary test set. The set of
// tests that have ever passed only grows; a candidate that fails one of them
// has regressed and is replaced by the last candidate that did not.

use std::collections::HashSet;
use std::sync::Arc;

use super::cancel::CancelToken;
use super::types::{AuxTest, Problem};
use crate::evaluator::utils::failure_report;
use crate::evaluator::{ExecutionContext, TestTierEvaluator};
use crate::infra::errors::BenchResult;
use crate::provider::SolutionProducer;

/// Loop-local state. Created at entry, discarded at exit.
#[derive(Debug, Clone)]
pub struct RepairState {
    /// Inputs of every test some candidate has passed. Never shrinks.
    pub passed_test_inputs: HashSet<Vec<String>>,
    pub last_known_good_solution: String,
    pub attempts_used: u32,
}

impl RepairState {
    fn new(candidate: &str, seed: HashSet<Vec<String>>) -> Self {
        Self {
            passed_test_inputs: seed,
            last_known_good_solution: candidate.to_string(),
            attempts_used: 0,
        }
    }

    fn count_passed(&self, tests: &[AuxTest]) -> usize {
        tests
            .iter()
            .filter(|t| self.passed_test_inputs.contains(&t.key()))
            .count()
    }
}

/// What happened in one round, for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrace {
    pub round: u32,
    /// Candidate evaluated in this round.
    pub evaluated: String,
    /// Working candidate after the regression check.
    pub working: String,
    pub failing: usize,
    pub regressed: bool,
    /// Size of the passed-set at the end of the round.
    pub passed_set_len: usize,
}

#[derive(Debug, Clone)]
pub struct RepairReport {
    pub solution: String,
    pub tests_total: usize,
    pub tests_passed: usize,
    /// Fix requests actually sent to the producer.
    pub fixes_used: u32,
    /// Rounds that ended with failing tests, whether or not a fix followed.
    pub attempts_used: u32,
    pub converged: bool,
    /// Set when a recoverable collaborator error cut the loop short.
    pub aborted: Option<String>,
    pub passed_test_inputs: HashSet<Vec<String>>,
    pub trace: Vec<RoundTrace>,
}

struct RoundEvaluation {
    passing: Vec<usize>,
    /// (test index, evidence for the fixer)
    failing: Vec<(usize, String)>,
}

pub struct RepairLoop {
    evaluator: Arc<dyn TestTierEvaluator>,
    producer: Arc<dyn SolutionProducer>,
    max_attempts: u32,
    cancel: CancelToken,
}

impl RepairLoop {
    pub fn new(
        evaluator: Arc<dyn TestTierEvaluator>,
        producer: Arc<dyn SolutionProducer>,
        max_attempts: u32,
    ) -> Self {
        Self {
            evaluator,
            producer,
            max_attempts: max_attempts.max(1),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the loop from an empty passed-set.
    pub async fn run(
        &self,
        problem: &Problem,
        candidate: &str,
        tests: &[AuxTest],
    ) -> BenchResult<RepairReport> {
        self.run_seeded(problem, candidate, tests, HashSet::new())
            .await
    }

    /// Run the loop with tests already known to be satisfiable.
    ///
    /// Recoverable collaborator errors end the loop early and are reported in
    /// `aborted`; fatal ones propagate.
    pub async fn run_seeded(
        &self,
        problem: &Problem,
        candidate: &str,
        tests: &[AuxTest],
        seed: HashSet<Vec<String>>,
    ) -> BenchResult<RepairReport> {
        let mut state = RepairState::new(candidate, seed);
        let mut current = candidate.to_string();
        let mut report = RepairReport {
            solution: current.clone(),
            tests_total: tests.len(),
            tests_passed: state.count_passed(tests),
            fixes_used: 0,
            attempts_used: 0,
            converged: tests.is_empty(),
            aborted: None,
            passed_test_inputs: HashSet::new(),
            trace: Vec::new(),
        };

        if tests.is_empty() {
            report.passed_test_inputs = state.passed_test_inputs;
            return Ok(report);
        }

        let ctx = ExecutionContext::scoped()?;

        for round in 0..self.max_attempts {
            self.cancel.check()?;
            let evaluated = current.clone();
            let evaluation = match self.evaluate(tests, &current, &ctx).await {
                Ok(ev) => ev,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(problem = %problem.name, round, "Repair loop aborted: {}", e);
                    report.aborted = Some(e.to_string());
                    // The unevaluated candidate is never reported.
                    current = state.last_known_good_solution.clone();
                    break;
                }
            };

            let regressed = evaluation
                .failing
                .iter()
                .any(|(idx, _)| state.passed_test_inputs.contains(&tests[*idx].key()));

            if regressed {
                tracing::info!(
                    problem = %problem.name,
                    round,
                    "Candidate failed a test that passed before, reverting to last good solution"
                );
                current = state.last_known_good_solution.clone();
            } else {
                for idx in &evaluation.passing {
                    if state.passed_test_inputs.insert(tests[*idx].key()) {
                        tracing::debug!(problem = %problem.name, round, test = idx, "Test passed, adding to passed set");
                    }
                }
                state.last_known_good_solution = current.clone();
            }

            let passed = state.count_passed(tests);
            report.trace.push(RoundTrace {
                round,
                evaluated,
                working: current.clone(),
                failing: evaluation.failing.len(),
                regressed,
                passed_set_len: state.passed_test_inputs.len(),
            });

            tracing::info!(
                problem = %problem.name,
                round,
                "Passed {} out of {} tests",
                passed,
                tests.len()
            );

            if evaluation.failing.is_empty() || passed == tests.len() {
                report.converged = true;
                break;
            }

            state.attempts_used += 1;
            if round + 1 < self.max_attempts {
                let error_text = representative_error(&evaluation, tests, &state);
                match self
                    .cancel
                    .guard(self.producer.fix(problem, &current, &error_text))
                    .await
                {
                    Ok(fixed) => {
                        report.fixes_used += 1;
                        current = fixed;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::error!(problem = %problem.name, round, "Fix request failed: {}", e);
                        report.aborted = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        report.solution = current;
        report.tests_passed = state.count_passed(tests);
        report.attempts_used = state.attempts_used;
        report.passed_test_inputs = state.passed_test_inputs;
        Ok(report)
    }

    async fn evaluate(
        &self,
        tests: &[AuxTest],
        candidate: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<RoundEvaluation> {
        let mut passing = Vec::new();
        let mut failing = Vec::new();

        for (idx, test) in tests.iter().enumerate() {
            let report = self
                .cancel
                .guard(self.evaluator.run_cases(&test.cases, candidate, ctx))
                .await?;

            if report.outcomes.is_empty() {
                failing.push((idx, "test produced no outcome".to_string()));
            } else if report.outcomes.len() != test.cases.len() {
                failing.push((
                    idx,
                    format!(
                        "evaluator returned {} outcome(s) for {} case(s)",
                        report.outcomes.len(),
                        test.cases.len()
                    ),
                ));
            } else if report.all_passed() {
                passing.push(idx);
            } else {
                let evidence = test
                    .cases
                    .iter()
                    .zip(report.outcomes.iter())
                    .find(|(_, o)| !o.passed || o.timed_out)
                    .map(|(case, outcome)| failure_report(case, outcome))
                    .unwrap_or_default();
                failing.push((idx, evidence));
            }
        }

        Ok(RoundEvaluation { passing, failing })
    }
}

/// Pick the failure to hand the fixer: prefer a test that has never passed,
/// since that is the one the working candidate still has to learn.
fn representative_error(evaluation: &RoundEvaluation, tests: &[AuxTest], state: &RepairState) -> String {
    evaluation
        .failing
        .iter()
        .find(|(idx, _)| !state.passed_test_inputs.contains(&tests[*idx].key()))
        .or_else(|| evaluation.failing.first())
        .map(|(_, err)| err.clone())
        .unwrap_or_default()
}
