// src/provider/command.rs — Solution producer backed by an external command
//
// Each call spawns the configured helper, writes one JSON request to its
// stdin and reads one JSON answer (`{"solution": "..."}`) from its stdout.
// Exit code 75 (EX_TEMPFAIL) marks a transient failure worth retrying.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{clean_solution, SolutionProducer, SolveOutcome};
use crate::core::types::{Problem, TestSet};
use crate::infra::config::ProducerConfig;
use crate::infra::errors::{BenchError, BenchResult};
use crate::util::truncate_str;

const EX_TEMPFAIL: i32 = 75;

#[derive(Debug, Serialize)]
struct ProblemBrief<'a> {
    name: &'a str,
    description: &'a str,
    tags: &'a [String],
    public_tests: &'a TestSet,
}

impl<'a> From<&'a Problem> for ProblemBrief<'a> {
    fn from(p: &'a Problem) -> Self {
        Self {
            name: &p.name,
            description: &p.description,
            tags: &p.cf_tags,
            public_tests: &p.public_tests,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ProducerRequest<'a> {
    Solve {
        problem: ProblemBrief<'a>,
        iteration: u32,
    },
    Fix {
        problem: ProblemBrief<'a>,
        candidate: &'a str,
        error: &'a str,
    },
}

#[derive(Debug, Deserialize)]
struct ProducerResponse {
    solution: Option<String>,
}

pub struct CommandProducer {
    program: String,
    args: Vec<String>,
}

impl CommandProducer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `[producer]`; `None` when no command is configured.
    pub fn from_config(config: &ProducerConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .map(|cmd| Self::new(cmd.clone(), config.args.clone()))
    }

    async fn call(&self, request: &ProducerRequest<'_>) -> BenchResult<ProducerResponse> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BenchError::Infrastructure(format!(
                    "failed to launch producer '{}': {e}",
                    self.program
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(&payload).await;
            });
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BenchError::producer(format!("producer wait failed: {e}"), true))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::producer(
                format!(
                    "producer exited with {}: {}",
                    output.status,
                    truncate_str(stderr.trim(), 500)
                ),
                output.status.code() == Some(EX_TEMPFAIL),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            BenchError::producer(format!("producer returned malformed JSON: {e}"), false)
        })
    }
}

#[async_trait]
impl SolutionProducer for CommandProducer {
    async fn solve(&self, problem: &Problem, iteration: u32) -> BenchResult<SolveOutcome> {
        let response = self
            .call(&ProducerRequest::Solve {
                problem: problem.into(),
                iteration,
            })
            .await?;
        Ok(SolveOutcome {
            solution: response.solution.map(|s| clean_solution(&s)),
            ..Default::default()
        })
    }

    async fn fix(&self, problem: &Problem, candidate: &str, error_text: &str) -> BenchResult<String> {
        let response = self
            .call(&ProducerRequest::Fix {
                problem: problem.into(),
                candidate,
                error: error_text,
            })
            .await?;
        response
            .solution
            .map(|s| clean_solution(&s))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BenchError::producer("producer returned no fixed solution", false))
    }
}
