// src/infra/errors.rs — Error types for repairbench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    // Solution producer errors (the external reasoning service)
    #[error("Solution producer error: {message}")]
    Producer { message: String, retriable: bool },

    #[error("Solution producer rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    // Test execution errors
    #[error("Evaluator error: {message}")]
    Evaluator { message: String },

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("Run cancelled")]
    Cancelled,

    // Data
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Results store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub fn producer(message: impl Into<String>, retriable: bool) -> Self {
        BenchError::Producer {
            message: message.into(),
            retriable,
        }
    }

    pub fn evaluator(message: impl Into<String>) -> Self {
        BenchError::Evaluator {
            message: message.into(),
        }
    }

    /// Errors the retry wrapper may try again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            BenchError::Producer {
                retriable: true,
                ..
            } | BenchError::RateLimited { .. }
        )
    }

    /// Errors that escape the innermost scope and abort the enclosing task.
    ///
    /// Everything else is recoverable: it is logged and counted as
    /// "no progress" for the round or attempt that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BenchError::Infrastructure(_)
                | BenchError::Cancelled
                | BenchError::Store(_)
                | BenchError::Io(_)
        )
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
