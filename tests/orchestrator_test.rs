// tests/orchestrator_test.rs — Integration test: dataset runs with mock collaborators

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use repairbench::core::types::{AuxTest, Problem, TestCase, TestOutcome, TestSet, Tier};
use repairbench::core::{CancelToken, DatasetOrchestrator, OrchestratorConfig};
use repairbench::dataset::Dataset;
use repairbench::evaluator::{ExecutionContext, TestTierEvaluator, TierReport};
use repairbench::infra::config::RepairConfig;
use repairbench::infra::errors::{BenchError, BenchResult};
use repairbench::provider::staged::StagedSolver;
use repairbench::provider::{SolutionProducer, SolveOutcome};
use repairbench::results::ResultsStore;

/// A candidate is a comma-separated list of the inputs it answers correctly.
/// Optionally fails outright on one tier to simulate a broken sandbox.
struct ListEvaluator {
    broken_tier: Option<Tier>,
}

impl ListEvaluator {
    fn new() -> Self {
        Self { broken_tier: None }
    }
}

#[async_trait]
impl TestTierEvaluator for ListEvaluator {
    async fn run_cases(
        &self,
        cases: &[TestCase],
        candidate: &str,
        _ctx: &ExecutionContext,
    ) -> BenchResult<TierReport> {
        let known: Vec<&str> = candidate.split(',').map(str::trim).collect();
        Ok(TierReport::from_outcomes(
            cases
                .iter()
                .map(|c| {
                    let passed = known.contains(&c.input.as_str());
                    TestOutcome {
                        passed,
                        actual_output: String::new(),
                        error_text: (!passed).then(|| format!("no answer for {}", c.input)),
                        timed_out: false,
                    }
                })
                .collect(),
        ))
    }

    async fn run_tier(
        &self,
        tier: Tier,
        problem: &Problem,
        candidate: &str,
        ctx: &ExecutionContext,
    ) -> BenchResult<TierReport> {
        if self.broken_tier == Some(tier) {
            return Err(BenchError::evaluator("sandbox crashed"));
        }
        self.run_cases(&problem.tier(tier).cases(), candidate, ctx).await
    }
}

/// Drafts per (problem name, iteration); each fix appends the input named on
/// the second line of the failure report. Counts every call.
struct ScriptedProducer {
    drafts: HashMap<(String, u32), String>,
    fallback: String,
    infra_failure_for: Option<String>,
    solve_calls: AtomicU32,
    fix_calls: AtomicU32,
    seen: Mutex<Vec<(String, u32)>>,
}

impl ScriptedProducer {
    fn new(fallback: &str) -> Self {
        Self {
            drafts: HashMap::new(),
            fallback: fallback.to_string(),
            infra_failure_for: None,
            solve_calls: AtomicU32::new(0),
            fix_calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn draft(mut self, problem: &str, iteration: u32, code: &str) -> Self {
        self.drafts
            .insert((problem.to_string(), iteration), code.to_string());
        self
    }
}

#[async_trait]
impl SolutionProducer for ScriptedProducer {
    async fn solve(&self, problem: &Problem, iteration: u32) -> BenchResult<SolveOutcome> {
        self.solve_calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((problem.name.clone(), iteration));
        if self.infra_failure_for.as_deref() == Some(problem.name.as_str()) {
            return Err(BenchError::Infrastructure("interpreter vanished".into()));
        }
        let code = self
            .drafts
            .get(&(problem.name.clone(), iteration))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        Ok(SolveOutcome::solution(code))
    }

    async fn fix(&self, _problem: &Problem, candidate: &str, error_text: &str) -> BenchResult<String> {
        self.fix_calls.fetch_add(1, Ordering::SeqCst);
        let input = error_text.lines().nth(1).unwrap_or_default();
        Ok(format!("{candidate},{input}"))
    }
}

fn tests(inputs: &[&str]) -> TestSet {
    TestSet {
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: inputs.iter().map(|_| "ok".to_string()).collect(),
    }
}

fn problem(name: &str) -> Problem {
    let mut p = Problem::new(name);
    p.public_tests = tests(&["p1"]);
    p.private_tests = tests(&["q1", "q2"]);
    p.generated_tests = tests(&["g1"]);
    p.ai_tests = vec![AuxTest::single("p1", "ok"), AuxTest::single("a1", "ok")];
    p
}

const SOLVES_ALL: &str = "p1,a1,q1,q2,g1";

fn orchestrator(
    producer: Arc<ScriptedProducer>,
    evaluator: Arc<ListEvaluator>,
    iterations: u32,
    max_allowed_calls: u32,
    max_concurrent_problems: usize,
) -> DatasetOrchestrator {
    let repair = RepairConfig {
        max_allowed_calls,
        max_public_calls: 2,
    };
    let staged = Arc::new(StagedSolver::new(producer, evaluator.clone(), &repair));
    DatasetOrchestrator::new(
        staged,
        evaluator,
        OrchestratorConfig {
            num_iterations: iterations,
            max_concurrent_problems,
            max_concurrent_iterations: 2,
        },
    )
}

fn load(path: &Path) -> ResultsStore {
    ResultsStore::load(path).unwrap()
}

#[tokio::test]
async fn test_end_to_end_two_iterations() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("solution_database.json");
    let dataset = Dataset::from_problems("valid", vec![problem("1548_A")]);

    let producer = Arc::new(
        ScriptedProducer::new("p1")
            .draft("1548_A", 0, SOLVES_ALL)
            .draft("1548_A", 1, "p1"),
    );
    let summary = orchestrator(producer.clone(), Arc::new(ListEvaluator::new()), 2, 3, 4)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.solved, 1);

    let store = load(&results);
    let record = store.problem("valid", 0).unwrap();
    assert_eq!(record.len(), 2);

    let first = record.get(0).unwrap();
    assert!(first.is_solved());
    assert_eq!(first.solution, SOLVES_ALL);
    assert_eq!(first.fixes_via_ai_tests, Some(0));

    // The second attempt learns the AI test but never the private ones.
    let second = record.get(1).unwrap();
    assert!(!second.is_solved());
    assert_eq!(second.solution, "p1,a1");
    assert_eq!(second.fixes_via_ai_tests, Some(1));
    assert_eq!(second.fixes_via_public_tests, Some(0));
    assert_eq!(second.failed_private, 2);

    // Persisted under the flat field names.
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results).unwrap()).unwrap();
    assert_eq!(raw["valid"]["0"]["iteration_1"]["number_of_llm_fixes_ai"], 1);
    assert_eq!(raw["valid"]["0"]["iteration_0"]["test_passed_generate"], 1);
}

#[tokio::test]
async fn test_resumed_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let dataset = Dataset::from_problems("valid", vec![problem("A"), problem("B")]);

    let first = Arc::new(ScriptedProducer::new("p1").draft("A", 0, SOLVES_ALL));
    orchestrator(first.clone(), Arc::new(ListEvaluator::new()), 2, 3, 2)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();
    let after_first = load(&results);
    assert_eq!(first.solve_calls.load(Ordering::SeqCst), 4);

    let second = Arc::new(ScriptedProducer::new("nothing useful"));
    let summary = orchestrator(second.clone(), Arc::new(ListEvaluator::new()), 2, 3, 2)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();

    // Every slot already carried a solution: no solve, no fix.
    assert_eq!(second.solve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.fix_calls.load(Ordering::SeqCst), 0);
    assert_eq!(load(&results), after_first);
    assert_eq!(summary.solved, 1);
}

#[tokio::test]
async fn test_empty_prior_records_are_rerun() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    std::fs::write(&results, r#"{"valid": {"0": {"iteration_0": {}}}}"#).unwrap();
    let dataset = Dataset::from_problems("valid", vec![problem("A")]);

    let producer = Arc::new(ScriptedProducer::new(SOLVES_ALL));
    orchestrator(producer.clone(), Arc::new(ListEvaluator::new()), 1, 3, 1)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();

    assert_eq!(producer.solve_calls.load(Ordering::SeqCst), 1);
    assert!(load(&results).problem("valid", 0).unwrap().is_solved());
}

#[tokio::test]
async fn test_invalid_problem_is_skipped() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let mut invalid = problem("broken");
    invalid.is_valid_problem = false;
    let dataset = Dataset::from_problems("valid", vec![invalid, problem("fine")]);

    let producer = Arc::new(ScriptedProducer::new(SOLVES_ALL));
    let summary = orchestrator(producer.clone(), Arc::new(ListEvaluator::new()), 1, 3, 2)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempted, 1);
    let store = load(&results);
    assert!(store.problem("valid", 0).is_none());
    assert!(store.problem("valid", 1).is_some());
    assert!(producer
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|(name, _)| name == "fine"));
}

#[tokio::test]
async fn test_broken_tier_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let dataset = Dataset::from_problems("valid", vec![problem("A")]);

    let evaluator = Arc::new(ListEvaluator {
        broken_tier: Some(Tier::Generated),
    });
    orchestrator(
        Arc::new(ScriptedProducer::new(SOLVES_ALL)),
        evaluator,
        1,
        3,
        1,
    )
    .run(&dataset, "valid", &results)
    .await
    .unwrap();

    let store = load(&results);
    let rec = store.problem("valid", 0).unwrap().get(0).unwrap();
    assert_eq!(rec.passed_generated + rec.failed_generated + rec.timeout_generated, 0);
    assert_eq!(rec.passed_public, 1);
    assert_eq!(rec.passed_private, 2);
    // Private passes alone are enough.
    assert!(rec.is_solved());
}

#[tokio::test]
async fn test_concurrent_problems_lose_no_updates() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let problems: Vec<Problem> = (0..40).map(|i| problem(&format!("P{i}"))).collect();
    let dataset = Dataset::from_problems("valid", problems);

    let summary = orchestrator(
        Arc::new(ScriptedProducer::new(SOLVES_ALL)),
        Arc::new(ListEvaluator::new()),
        3,
        3,
        8,
    )
    .run(&dataset, "valid", &results)
    .await
    .unwrap();

    assert_eq!(summary.attempted, 40);
    assert_eq!(summary.solved, 40);
    let store = load(&results);
    let split = store.split("valid").unwrap();
    assert_eq!(split.len(), 40);
    assert!(split.values().all(|r| r.len() == 3));
    // Keys come back in numeric order.
    let keys: Vec<u64> = split.keys().copied().collect();
    assert_eq!(keys, (0..40).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_corrupt_store_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    std::fs::write(&results, "{\"valid\": {\"0\": ").unwrap();
    let dataset = Dataset::from_problems("valid", vec![problem("A")]);

    let summary = orchestrator(
        Arc::new(ScriptedProducer::new(SOLVES_ALL)),
        Arc::new(ListEvaluator::new()),
        1,
        3,
        1,
    )
    .run(&dataset, "valid", &results)
    .await
    .unwrap();

    assert_eq!(summary.solved, 1);
    assert!(load(&results).problem("valid", 0).is_some());
}

#[tokio::test]
async fn test_fatal_problem_does_not_abort_siblings() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let dataset = Dataset::from_problems("valid", vec![problem("ok-1"), problem("doomed"), problem("ok-2")]);

    let mut producer = ScriptedProducer::new(SOLVES_ALL);
    producer.infra_failure_for = Some("doomed".into());
    let summary = orchestrator(Arc::new(producer), Arc::new(ListEvaluator::new()), 1, 3, 3)
        .run(&dataset, "valid", &results)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.solved, 2);
    let store = load(&results);
    // No slot for the failed iteration, so a rerun retries it.
    assert!(store.problem("valid", 1).is_none());
    assert!(store.problem("valid", 0).unwrap().is_solved());
    assert!(store.problem("valid", 2).unwrap().is_solved());
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.json");
    let dataset = Dataset::from_problems("valid", vec![problem("A")]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let producer = Arc::new(ScriptedProducer::new(SOLVES_ALL));
    let err = orchestrator(producer.clone(), Arc::new(ListEvaluator::new()), 1, 3, 1)
        .with_cancel(cancel)
        .run(&dataset, "valid", &results)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Cancelled));
    assert_eq!(producer.solve_calls.load(Ordering::SeqCst), 0);
    assert!(!results.exists());
}

#[tokio::test]
async fn test_unknown_split_is_an_error() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset::from_problems("valid", vec![problem("A")]);
    let err = orchestrator(
        Arc::new(ScriptedProducer::new(SOLVES_ALL)),
        Arc::new(ListEvaluator::new()),
        1,
        3,
        1,
    )
    .run(&dataset, "test", &dir.path().join("r.json"))
    .await
    .unwrap_err();
    assert!(matches!(err, BenchError::Dataset(_)));
}
