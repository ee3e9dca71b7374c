// src/evaluator/test_runner.rs — Subprocess test runner
//
// Writes the candidate into the execution context and runs the configured
// interpreter once per case, feeding the input on stdin and comparing stdout
// with the expected output. Cases that exceed the time limit are killed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::utils::outputs_match;
use super::{ExecutionContext, TestTierEvaluator, TierReport};
use crate::core::types::{TestCase, TestOutcome};
use crate::infra::config::ExecutionConfig;
use crate::infra::errors::{BenchError, BenchResult};

const SCRIPT_NAME: &str = "solution.py";

/// Runs candidates as scripts under an interpreter.
pub struct ProcessTestRunner {
    interpreter: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessTestRunner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            args: Vec::new(),
            timeout,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            args: config.args.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Run one case. Only a failure to launch the interpreter is an error.
    async fn run_case(&self, script: &Path, dir: &Path, case: &TestCase) -> BenchResult<TestOutcome> {
        let mut child = Command::new(&self.interpreter)
            .args(&self.args)
            .arg(script)
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BenchError::Infrastructure(format!(
                    "failed to launch interpreter '{}': {e}",
                    self.interpreter
                ))
            })?;

        // Feed stdin from a separate task so a program that never reads its
        // input cannot block us on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let input = case.input.clone();
            tokio::spawn(async move {
                let _ = stdin.write_all(input.as_bytes()).await;
            });
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| BenchError::evaluator(format!("wait failed: {e}")))?,
            Err(_) => {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "Test case timed out");
                return Ok(TestOutcome {
                    passed: false,
                    actual_output: String::new(),
                    error_text: Some(format!(
                        "timed out after {}ms",
                        self.timeout.as_millis()
                    )),
                    timed_out: true,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let success = output.status.success();

        let error_text = if !stderr.is_empty() {
            Some(stderr)
        } else if !success {
            Some(format!("process exited with {}", output.status))
        } else {
            None
        };

        Ok(TestOutcome {
            passed: success && outputs_match(&case.expected_output, &stdout),
            actual_output: stdout,
            error_text,
            timed_out: false,
        })
    }
}

#[async_trait]
impl TestTierEvaluator for ProcessTestRunner {
    async fn run_cases(
        &self,
        cases: &[TestCase],
        candidate: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<TierReport> {
        if cases.is_empty() {
            return Ok(TierReport::default());
        }

        let script = ctx.path().join(SCRIPT_NAME);
        tokio::fs::write(&script, candidate).await.map_err(|e| {
            BenchError::Infrastructure(format!("cannot write candidate script: {e}"))
        })?;

        let mut outcomes = Vec::with_capacity(cases.len());
        for case in cases {
            outcomes.push(self.run_case(&script, ctx.path(), case).await?);
        }

        let report = TierReport::from_outcomes(outcomes);
        tracing::debug!(
            passed = report.counts.passed,
            failed = report.counts.failed,
            timed_out = report.counts.timed_out,
            "Evaluated {} case(s)",
            cases.len()
        );
        Ok(report)
    }
}
