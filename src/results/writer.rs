// src/results/writer.rs — Single-writer task for the results store
//
// Schedulers never touch the file. They send whole problem records to this
// task, which merges each one into the live store and rewrites the snapshot
// before acknowledging. Merges are serialized through the channel, so
// concurrent completions cannot overwrite each other.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

use super::store::ResultsStore;
use crate::core::types::ProblemRecord;
use crate::infra::errors::{BenchError, BenchResult};

#[derive(Debug)]
pub enum ResultsCommand {
    Commit {
        split: String,
        problem: u64,
        record: ProblemRecord,
        resp: oneshot::Sender<BenchResult<()>>,
    },
    Snapshot {
        resp: oneshot::Sender<ResultsStore>,
    },
}

/// A handle to the results writer that uses message passing.
#[derive(Clone)]
pub struct ResultsHandle {
    tx: mpsc::Sender<ResultsCommand>,
}

impl ResultsHandle {
    pub fn new(tx: mpsc::Sender<ResultsCommand>) -> Self {
        Self { tx }
    }

    /// Merge `record` as the new value for `problem` and persist.
    /// Returns once the snapshot containing it is on disk.
    pub async fn commit(&self, split: &str, problem: u64, record: ProblemRecord) -> BenchResult<()> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(ResultsCommand::Commit {
                split: split.to_string(),
                problem,
                record,
                resp: resp_tx,
            })
            .await
            .map_err(|_| BenchError::Store("results writer has stopped".into()))?;
        resp_rx
            .await
            .map_err(|_| BenchError::Store("results writer dropped the request".into()))?
    }

    /// Current contents of the live store.
    pub async fn snapshot(&self) -> BenchResult<ResultsStore> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(ResultsCommand::Snapshot { resp: resp_tx })
            .await
            .map_err(|_| BenchError::Store("results writer has stopped".into()))?;
        resp_rx
            .await
            .map_err(|_| BenchError::Store("results writer dropped the request".into()))
    }
}

/// Spawn the writer. The join handle yields the final store once every
/// handle has been dropped.
pub fn spawn_results_writer(
    store: ResultsStore,
    path: PathBuf,
) -> (ResultsHandle, tokio::task::JoinHandle<ResultsStore>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = ResultsHandle::new(tx);
    let join_handle = tokio::spawn(run_results_writer(store, path, rx));
    (handle, join_handle)
}

/// The background task that owns the store.
pub async fn run_results_writer(
    mut store: ResultsStore,
    path: PathBuf,
    mut rx: mpsc::Receiver<ResultsCommand>,
) -> ResultsStore {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            ResultsCommand::Commit {
                split,
                problem,
                record,
                resp,
            } => {
                store.insert(&split, problem, record);
                let res = store.save(&path);
                match &res {
                    Ok(()) => tracing::debug!(split = %split, problem, "Results persisted"),
                    Err(e) => tracing::error!(split = %split, problem, "Failed to persist results: {}", e),
                }
                let _ = resp.send(res);
            }
            ResultsCommand::Snapshot { resp } => {
                let _ = resp.send(store.clone());
            }
        }
    }
    store
}
