// src/evaluator/context.rs — Per-attempt execution context
//
// Each evaluation runs inside its own scratch directory. The directory is
// passed explicitly to the test runner; the process working directory is
// never touched, so concurrent attempts cannot see each other's files.

use std::path::Path;

use tempfile::TempDir;

use crate::infra::errors::{BenchError, BenchResult};

/// A scratch directory removed when the context is dropped.
#[derive(Debug)]
pub struct ExecutionContext {
    dir: TempDir,
}

impl ExecutionContext {
    pub fn scoped() -> BenchResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("repairbench-")
            .tempdir()
            .map_err(|e| {
                BenchError::Infrastructure(format!("cannot create execution directory: {e}"))
            })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
