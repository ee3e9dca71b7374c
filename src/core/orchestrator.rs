// src/core/orchestrator.rs — Dataset-level controller

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};

use super::cancel::CancelToken;
use super::iteration::IterationRunner;
use super::scheduler::ProblemScheduler;
use super::types::*;
use crate::dataset::Dataset;
use crate::evaluator::TestTierEvaluator;
use crate::infra::config::Config;
use crate::infra::errors::{BenchError, BenchResult};
use crate::provider::SolutionProducer;
use crate::results::{spawn_results_writer, ResultsStore, SplitRecords};

/// Knobs the orchestrator takes from `Config`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub num_iterations: u32,
    pub max_concurrent_problems: usize,
    pub max_concurrent_iterations: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            num_iterations: config.dataset.num_iterations,
            max_concurrent_problems: config.concurrency.max_concurrent_problems,
            max_concurrent_iterations: config.concurrency.max_concurrent_iterations,
        }
    }
}

/// How one problem's scheduler ended.
enum ProblemOutcome {
    Skipped,
    Finished { solved: bool },
    Failed,
    NotStarted,
}

/// Drives every problem of a split through its scheduler and owns the
/// results writer for the duration of the run.
pub struct DatasetOrchestrator {
    producer: Arc<dyn SolutionProducer>,
    evaluator: Arc<dyn TestTierEvaluator>,
    config: OrchestratorConfig,
    cancel: CancelToken,
    on_progress: Option<ProgressFn>,
}

impl DatasetOrchestrator {
    pub fn new(
        producer: Arc<dyn SolutionProducer>,
        evaluator: Arc<dyn TestTierEvaluator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            producer,
            evaluator,
            config,
            cancel: CancelToken::new(),
            on_progress: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run every problem of `split`, resuming from the results at
    /// `results_path`. One problem's failure never stops the others.
    pub async fn run(&self, dataset: &Dataset, split: &str, results_path: &Path) -> BenchResult<RunSummary> {
        let started = Instant::now();
        let problems = dataset.problems(split)?;

        let store = ResultsStore::load_or_default(results_path);
        // Priors come from this immutable copy; only the writer touches the live store.
        let snapshot: Arc<SplitRecords> = Arc::new(store.split(split).cloned().unwrap_or_default());
        let resumed = snapshot.values().filter(|r| r.is_solved()).count();

        tracing::info!(
            split,
            problems = problems.len(),
            resumed,
            iterations = self.config.num_iterations,
            "Starting run"
        );
        self.emit(ProgressEvent::RunStart {
            split: split.to_string(),
            problems: problems.len(),
            resumed,
        });

        let (handle, writer) = spawn_results_writer(store, results_path.to_path_buf());

        let runner = IterationRunner::new(self.producer.clone(), self.evaluator.clone())
            .with_cancel(self.cancel.clone());
        let mut scheduler = ProblemScheduler::new(
            runner,
            self.config.num_iterations,
            self.config.max_concurrent_iterations,
        );
        if let Some(ref cb) = self.on_progress {
            scheduler = scheduler.with_progress(cb.clone());
        }

        let outcomes: Vec<ProblemOutcome> = stream::iter(problems.iter().enumerate())
            .map(|(idx, problem)| {
                let number = idx as u64;
                let scheduler = &scheduler;
                let handle = &handle;
                let snapshot = &snapshot;
                async move {
                    if self.cancel.is_cancelled() {
                        return ProblemOutcome::NotStarted;
                    }
                    if !problem.is_valid_problem {
                        self.emit(ProgressEvent::ProblemSkipped { problem: number });
                    } else {
                        self.emit(ProgressEvent::ProblemStart {
                            problem: number,
                            name: problem.name.clone(),
                        });
                    }

                    let prior = snapshot.get(&number);
                    match scheduler.run(split, number, problem, prior, handle).await {
                        Ok(None) => ProblemOutcome::Skipped,
                        Ok(Some(record)) => {
                            let solved = record.is_solved();
                            self.emit(ProgressEvent::ProblemEnd {
                                problem: number,
                                solved,
                            });
                            ProblemOutcome::Finished { solved }
                        }
                        Err(BenchError::Cancelled) => ProblemOutcome::NotStarted,
                        Err(e) => {
                            tracing::error!(problem = number, name = %problem.name, "Problem failed: {}", e);
                            self.emit(ProgressEvent::ProblemFailed {
                                problem: number,
                                error: e.to_string(),
                            });
                            ProblemOutcome::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_problems.max(1))
            .collect()
            .await;

        drop(handle);
        writer
            .await
            .map_err(|e| BenchError::Store(format!("results writer panicked: {e}")))?;

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome {
                ProblemOutcome::Skipped => summary.skipped += 1,
                ProblemOutcome::Finished { solved } => {
                    summary.attempted += 1;
                    if solved {
                        summary.solved += 1;
                    }
                }
                ProblemOutcome::Failed => {
                    summary.attempted += 1;
                    summary.failed += 1;
                }
                ProblemOutcome::NotStarted => {}
            }
        }

        tracing::info!(
            split,
            attempted = summary.attempted,
            solved = summary.solved,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run complete"
        );
        self.emit(ProgressEvent::Complete {
            summary: summary.clone(),
        });

        if self.cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        Ok(summary)
    }
}
