// src/cli/run.rs — `repairbench solve`

use std::sync::Arc;

use anyhow::{anyhow, Context};

use super::progress::terminal_progress;
use super::SolveArgs;
use crate::core::types::RunSummary;
use crate::core::{CancelToken, DatasetOrchestrator, OrchestratorConfig};
use crate::dataset::Dataset;
use crate::evaluator::test_runner::ProcessTestRunner;
use crate::evaluator::TestTierEvaluator;
use crate::infra::config::Config;
use crate::infra::errors::BenchError;
use crate::provider::command::CommandProducer;
use crate::provider::retry::{RetryConfig, RetryProducer};
use crate::provider::staged::StagedSolver;
use crate::provider::SolutionProducer;

/// Build the producer stack: command helper, retry, then the repair stages.
pub fn build_producer(
    config: &Config,
    evaluator: Arc<dyn TestTierEvaluator>,
    cancel: CancelToken,
) -> anyhow::Result<Arc<dyn SolutionProducer>> {
    let command = CommandProducer::from_config(&config.producer).ok_or_else(|| {
        anyhow!("no solution producer configured; set [producer] command in config.toml")
    })?;
    let retrying: Arc<dyn SolutionProducer> = Arc::new(RetryProducer::with_config(
        Arc::new(command),
        RetryConfig::from(&config.producer),
    ));
    Ok(Arc::new(
        StagedSolver::new(retrying, evaluator, &config.repair).with_cancel(cancel),
    ))
}

pub async fn run_solve(mut config: Config, args: SolveArgs) -> anyhow::Result<RunSummary> {
    args.apply(&mut config);
    config.validate()?;

    let dataset_path = config
        .dataset
        .path
        .clone()
        .ok_or_else(|| anyhow!("no dataset given; pass --dataset or set [dataset] path"))?;
    let dataset = Dataset::load(&dataset_path)
        .with_context(|| format!("loading dataset {}", dataset_path.display()))?;

    let cancel = CancelToken::new();
    let evaluator: Arc<dyn TestTierEvaluator> =
        Arc::new(ProcessTestRunner::from_config(&config.execution));
    let producer = build_producer(&config, evaluator.clone(), cancel.clone())?;

    let mut orchestrator =
        DatasetOrchestrator::new(producer, evaluator, OrchestratorConfig::from(&config))
            .with_cancel(cancel.clone());
    if !args.quiet {
        orchestrator = orchestrator.with_progress(terminal_progress());
    }

    let split = config.dataset.split.clone();
    let results_path = config.dataset.results_path.clone();
    let run = orchestrator.run(&dataset, &split, &results_path);
    tokio::pin!(run);

    let result = tokio::select! {
        res = &mut run => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, finishing in-flight writes");
            cancel.cancel();
            run.await
        }
    };

    match result {
        Ok(summary) => {
            println!(
                "{} of {} attempted problem(s) solved ({} skipped, {} failed)",
                summary.solved, summary.attempted, summary.skipped, summary.failed
            );
            Ok(summary)
        }
        Err(BenchError::Cancelled) => Err(anyhow!(
            "run cancelled; rerun the same command to resume from {}",
            results_path.display()
        )),
        Err(e) => Err(e.into()),
    }
}
