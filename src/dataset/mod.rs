// src/dataset/mod.rs — Problem dataset loading
//
// The dataset is a JSON object keyed by split name, each split a list of
// problems. A problem's number is its position in that list.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::types::Problem;
use crate::infra::errors::{BenchError, BenchResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    splits: BTreeMap<String, Vec<Problem>>,
}

impl Dataset {
    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Dataset(format!("cannot read {}: {e}", path.display()))
        })?;
        let dataset = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            splits = dataset.splits.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_json(json: &str) -> BenchResult<Self> {
        serde_json::from_str(json).map_err(|e| BenchError::Dataset(format!("malformed dataset: {e}")))
    }

    pub fn from_problems(split: &str, problems: Vec<Problem>) -> Self {
        let mut splits = BTreeMap::new();
        splits.insert(split.to_string(), problems);
        Self { splits }
    }

    pub fn problems(&self, split: &str) -> BenchResult<&[Problem]> {
        self.splits.get(split).map(Vec::as_slice).ok_or_else(|| {
            let known: Vec<&str> = self.splits.keys().map(String::as_str).collect();
            BenchError::Dataset(format!(
                "split '{split}' not found (available: {})",
                known.join(", ")
            ))
        })
    }
}
