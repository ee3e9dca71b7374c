// src/core/scheduler.rs — Per-problem fan-out over iterations
//
// Runs every configured iteration of one problem (bounded concurrency),
// folds the results into the problem's record and commits it through the
// results writer.

use futures::stream::{self, StreamExt};

use super::iteration::IterationRunner;
use super::types::{IterationRecord, Problem, ProblemRecord, ProgressEvent, ProgressFn};
use crate::infra::errors::{BenchError, BenchResult};
use crate::results::ResultsHandle;

pub struct ProblemScheduler {
    runner: IterationRunner,
    num_iterations: u32,
    max_concurrent_iterations: usize,
    on_progress: Option<ProgressFn>,
}

impl ProblemScheduler {
    pub fn new(runner: IterationRunner, num_iterations: u32, max_concurrent_iterations: usize) -> Self {
        Self {
            runner,
            num_iterations,
            max_concurrent_iterations: max_concurrent_iterations.max(1),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressFn) -> Self {
        self.on_progress = Some(cb);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Attempt one problem.
    ///
    /// Returns `Ok(None)` for an invalid problem (nothing is written). A fatal
    /// iteration error is returned after the other iterations have been
    /// committed; the failed slot keeps its prior record or stays absent.
    pub async fn run(
        &self,
        split: &str,
        number: u64,
        problem: &Problem,
        prior: Option<&ProblemRecord>,
        results: &ResultsHandle,
    ) -> BenchResult<Option<ProblemRecord>> {
        if !problem.is_valid_problem {
            tracing::info!(problem = number, name = %problem.name, "Skipping invalid problem");
            return Ok(None);
        }

        let outcomes: Vec<(u32, bool, BenchResult<IterationRecord>)> =
            stream::iter(0..self.num_iterations)
                .map(|iteration| {
                    let prior_iteration = prior.and_then(|r| r.get(iteration));
                    async move {
                        let resumed = prior_iteration.is_some_and(IterationRecord::is_solved);
                        let result = self.runner.run(problem, iteration, prior_iteration).await;
                        (iteration, resumed, result)
                    }
                })
                .buffer_unordered(self.max_concurrent_iterations)
                .collect()
                .await;

        let mut record = prior.cloned().unwrap_or_default();
        let mut first_fatal: Option<BenchError> = None;
        let mut changed = false;

        for (iteration, resumed, result) in outcomes {
            match result {
                Ok(rec) => {
                    self.emit(ProgressEvent::IterationEnd {
                        problem: number,
                        iteration,
                        solved: rec.is_solved(),
                        resumed,
                    });
                    record.insert(iteration, rec);
                    changed = true;
                }
                Err(e) => {
                    if !matches!(e, BenchError::Cancelled) {
                        tracing::error!(problem = number, iteration, "Iteration failed: {}", e);
                    }
                    if first_fatal.is_none() {
                        first_fatal = Some(e);
                    }
                }
            }
        }

        if changed {
            results.commit(split, number, record.clone()).await?;
        }

        match first_fatal {
            Some(e) => Err(e),
            None => Ok(Some(record)),
        }
    }
}
