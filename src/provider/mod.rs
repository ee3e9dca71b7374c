// src/provider/mod.rs — Solution producer layer
//
// The engine asks an external reasoning service for candidates through the
// `SolutionProducer` trait. `command` talks to a helper process, `retry`
// adds backoff, and `staged` layers the repair stages on top.

pub mod command;
pub mod retry;
pub mod staged;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::Problem;
use crate::infra::errors::BenchResult;

/// What a solve call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOutcome {
    /// `None` (or an empty string) means no candidate was produced.
    pub solution: Option<String>,
    #[serde(default)]
    pub fixes_via_ai_tests: Option<u32>,
    #[serde(default)]
    pub fixes_via_public_tests: Option<u32>,
}

impl SolveOutcome {
    pub fn solution(code: impl Into<String>) -> Self {
        Self {
            solution: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn nothing() -> Self {
        Self::default()
    }

    /// The candidate, if one was produced and is not blank.
    pub fn candidate(&self) -> Option<&str> {
        self.solution
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// Core trait every solution source implements.
#[async_trait]
pub trait SolutionProducer: Send + Sync {
    /// Produce an initial candidate for one attempt at `problem`.
    async fn solve(&self, problem: &Problem, iteration: u32) -> BenchResult<SolveOutcome>;

    /// Revise `candidate` given the evidence of one failing test.
    async fn fix(&self, problem: &Problem, candidate: &str, error_text: &str) -> BenchResult<String>;
}

/// Strip markdown code fences and language tags from a model answer.
pub fn clean_solution(raw: &str) -> String {
    let mut s = raw.trim().trim_end_matches(|c| c == '`' || c == ' ' || c == '\n');
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    for tag in ["python3", "python", "py"] {
        if let Some(rest) = s.strip_prefix(tag) {
            if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
                s = rest;
                break;
            }
        }
    }
    s.trim_start_matches(['\r', '\n']).to_string()
}
