// src/results/store.rs — Persisted results document
//
// One JSON document: split → problem number → `iteration_<k>` → record.
// Problem numbers are kept as integers in memory so they order numerically;
// serde_json writes them back as decimal string keys.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::ProblemRecord;
use crate::infra::errors::{BenchError, BenchResult};

pub type SplitRecords = BTreeMap<u64, ProblemRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsStore {
    splits: BTreeMap<String, SplitRecords>,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the document at `path`.
    ///
    /// A missing or unreadable document is not an error: the run starts from
    /// an empty store and the problem is logged.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No results file yet, starting fresh");
            return Self::default();
        }
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "Results file unreadable, starting with an empty store: {}",
                    e
                );
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = serde_json::from_str(&content)?;
        Ok(store)
    }

    /// Atomically write the document (temp file + rename).
    pub fn save(&self, path: &Path) -> BenchResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BenchError::Store(format!("cannot serialize results: {e}")))?;

        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| BenchError::Store(format!("cannot create {}: {e}", dir.display())))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "results.json".into());
        let tmp = dir.join(format!(".{file_name}.tmp"));

        let write = || -> std::io::Result<()> {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.flush()?;
            f.sync_all()?;
            std::fs::rename(&tmp, path)
        };
        write().map_err(|e| BenchError::Store(format!("cannot write {}: {e}", path.display())))
    }

    pub fn split(&self, split: &str) -> Option<&SplitRecords> {
        self.splits.get(split)
    }

    pub fn problem(&self, split: &str, problem: u64) -> Option<&ProblemRecord> {
        self.splits.get(split).and_then(|s| s.get(&problem))
    }

    /// Replace one problem's record as a unit.
    pub fn insert(&mut self, split: &str, problem: u64, record: ProblemRecord) {
        self.splits
            .entry(split.to_string())
            .or_default()
            .insert(problem, record);
    }

    pub fn splits(&self) -> impl Iterator<Item = &str> {
        self.splits.keys().map(String::as_str)
    }
}
