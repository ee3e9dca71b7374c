// src/core/cancel.rs — Cooperative cancellation signal
//
// A cloneable token backed by a tokio watch channel. Every suspension point
// (producer or evaluator call) races against it, so an operator abort stops
// in-flight work without leaving half-written records behind.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::infra::errors::{BenchError, BenchResult};

#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signal every clone of this token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender gone: nobody can cancel any more.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Fail fast with `Cancelled` when the token is already set.
    pub fn check(&self) -> BenchResult<()> {
        if self.is_cancelled() {
            Err(BenchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `fut` unless cancellation wins the race.
    pub async fn guard<T, F>(&self, fut: F) -> BenchResult<T>
    where
        F: Future<Output = BenchResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(BenchError::Cancelled),
            res = fut => res,
        }
    }
}
