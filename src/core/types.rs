// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The three primary test tiers every problem carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Public,
    Private,
    Generated,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Public, Tier::Private, Tier::Generated];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Public => write!(f, "public"),
            Tier::Private => write!(f, "private"),
            Tier::Generated => write!(f, "generated"),
        }
    }
}

/// One (input, expected output) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// A tier as stored in the dataset: parallel input/output columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSet {
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
}

impl TestSet {
    /// Zip the columns into cases. Unpaired trailing entries are ignored.
    pub fn cases(&self) -> Vec<TestCase> {
        self.input
            .iter()
            .zip(self.output.iter())
            .map(|(i, o)| TestCase::new(i.clone(), o.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.input.len().min(self.output.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An auxiliary test: one or more cases that pass or fail together.
///
/// In the dataset the input may be a bare string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAuxTest", into = "RawAuxTest")]
pub struct AuxTest {
    pub cases: Vec<TestCase>,
}

impl AuxTest {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    pub fn single(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self::new(vec![TestCase::new(input, expected_output)])
    }

    /// Identity of the test in the passed-set: its inputs, in order.
    pub fn key(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.input.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAuxTest {
    input: OneOrMany,
    output: OneOrMany,
}

impl From<RawAuxTest> for AuxTest {
    fn from(raw: RawAuxTest) -> Self {
        let cases = raw
            .input
            .into_vec()
            .into_iter()
            .zip(raw.output.into_vec())
            .map(|(i, o)| TestCase::new(i, o))
            .collect();
        AuxTest { cases }
    }
}

impl From<AuxTest> for RawAuxTest {
    fn from(test: AuxTest) -> Self {
        let (input, output) = test
            .cases
            .into_iter()
            .map(|c| (c.input, c.expected_output))
            .unzip();
        RawAuxTest {
            input: OneOrMany::Many(input),
            output: OneOrMany::Many(output),
        }
    }
}

fn default_true() -> bool {
    true
}

/// An immutable problem description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cf_tags: Vec<String>,
    /// False when no known solution passes the problem's own generated tests.
    #[serde(default = "default_true")]
    pub is_valid_problem: bool,
    #[serde(default)]
    pub public_tests: TestSet,
    #[serde(default)]
    pub private_tests: TestSet,
    #[serde(default)]
    pub generated_tests: TestSet,
    #[serde(default, alias = "problem_ai_tests")]
    pub ai_tests: Vec<AuxTest>,
}

impl Problem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_valid_problem: true,
            ..Default::default()
        }
    }

    pub fn tier(&self, tier: Tier) -> &TestSet {
        match tier {
            Tier::Public => &self.public_tests,
            Tier::Private => &self.private_tests,
            Tier::Generated => &self.generated_tests,
        }
    }

    /// Public cases as auxiliary tests, one case each.
    pub fn public_as_aux(&self) -> Vec<AuxTest> {
        self.public_tests
            .cases()
            .into_iter()
            .map(|c| AuxTest::new(vec![c]))
            .collect()
    }
}

/// Result of running a candidate against one test case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    pub actual_output: String,
    pub error_text: Option<String>,
    pub timed_out: bool,
}

/// Pass/fail/timeout tally for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub passed: u32,
    pub failed: u32,
    pub timed_out: u32,
}

impl TierCounts {
    pub fn tally(outcomes: &[TestOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            if o.timed_out {
                acc.timed_out += 1;
            } else if o.passed {
                acc.passed += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> u32 {
        self.passed
            .saturating_add(self.failed)
            .saturating_add(self.timed_out)
    }
}

/// One attempt's outcome for one problem, in its persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationRecord {
    pub solution: String,
    #[serde(rename = "test_passed_public")]
    pub passed_public: u32,
    #[serde(rename = "test_failed_public")]
    pub failed_public: u32,
    #[serde(rename = "test_timeout_public")]
    pub timeout_public: u32,
    #[serde(rename = "test_passed_private")]
    pub passed_private: u32,
    #[serde(rename = "test_failed_private")]
    pub failed_private: u32,
    #[serde(rename = "test_timeout_private")]
    pub timeout_private: u32,
    #[serde(rename = "test_passed_generate")]
    pub passed_generated: u32,
    #[serde(rename = "test_failed_generate")]
    pub failed_generated: u32,
    #[serde(rename = "test_timeout_generate")]
    pub timeout_generated: u32,
    #[serde(
        rename = "number_of_llm_fixes_ai",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixes_via_ai_tests: Option<u32>,
    #[serde(
        rename = "number_of_llm_fixes_public",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixes_via_public_tests: Option<u32>,
}

impl IterationRecord {
    /// True for a record that was never populated (persisted as `{}`).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Solved iff private + generated tiers have no failures, no timeouts,
    /// and at least one pass between them.
    pub fn is_solved(&self) -> bool {
        self.failed_private == 0
            && self.failed_generated == 0
            && self.timeout_private == 0
            && self.timeout_generated == 0
            && (self.passed_private > 0 || self.passed_generated > 0)
    }

    pub fn counts(&self, tier: Tier) -> TierCounts {
        match tier {
            Tier::Public => TierCounts {
                passed: self.passed_public,
                failed: self.failed_public,
                timed_out: self.timeout_public,
            },
            Tier::Private => TierCounts {
                passed: self.passed_private,
                failed: self.failed_private,
                timed_out: self.timeout_private,
            },
            Tier::Generated => TierCounts {
                passed: self.passed_generated,
                failed: self.failed_generated,
                timed_out: self.timeout_generated,
            },
        }
    }

    pub fn set_counts(&mut self, tier: Tier, counts: TierCounts) {
        let (p, f, t) = match tier {
            Tier::Public => (
                &mut self.passed_public,
                &mut self.failed_public,
                &mut self.timeout_public,
            ),
            Tier::Private => (
                &mut self.passed_private,
                &mut self.failed_private,
                &mut self.timeout_private,
            ),
            Tier::Generated => (
                &mut self.passed_generated,
                &mut self.failed_generated,
                &mut self.timeout_generated,
            ),
        };
        *p = counts.passed;
        *f = counts.failed;
        *t = counts.timed_out;
    }
}

/// Key of iteration `k` inside a problem record.
pub fn iteration_key(iteration: u32) -> String {
    format!("iteration_{iteration}")
}

/// All iteration records of one problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemRecord(pub BTreeMap<String, IterationRecord>);

impl ProblemRecord {
    pub fn get(&self, iteration: u32) -> Option<&IterationRecord> {
        self.0.get(&iteration_key(iteration))
    }

    pub fn insert(&mut self, iteration: u32, record: IterationRecord) {
        self.0.insert(iteration_key(iteration), record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_solved(&self) -> bool {
        self.0.values().any(IterationRecord::is_solved)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IterationRecord)> {
        self.0.iter()
    }
}

/// Totals for one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub skipped: usize,
    pub solved: usize,
    /// Problems whose scheduler returned a fatal error.
    pub failed: usize,
}

/// Shared progress callback. Called from concurrent tasks.
pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during a run for real-time progress display.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStart {
        split: String,
        problems: usize,
        resumed: usize,
    },
    ProblemSkipped {
        problem: u64,
    },
    ProblemStart {
        problem: u64,
        name: String,
    },
    IterationEnd {
        problem: u64,
        iteration: u32,
        solved: bool,
        resumed: bool,
    },
    ProblemEnd {
        problem: u64,
        solved: bool,
    },
    ProblemFailed {
        problem: u64,
        error: String,
    },
    Complete {
        summary: RunSummary,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(
        passed_private: u32,
        passed_generated: u32,
        failed_private: u32,
        timeout_generated: u32,
    ) -> IterationRecord {
        IterationRecord {
            solution: "print(1)".into(),
            passed_private,
            passed_generated,
            failed_private,
            timeout_generated,
            ..Default::default()
        }
    }

    #[test]
    fn test_solved_with_private_passes_only() {
        assert!(record(2, 0, 0, 0).is_solved());
    }

    #[test]
    fn test_not_solved_without_any_pass() {
        assert!(!record(0, 0, 0, 0).is_solved());
    }

    #[test]
    fn test_not_solved_with_failure_or_timeout() {
        assert!(!record(3, 4, 1, 0).is_solved());
        assert!(!record(3, 4, 0, 1).is_solved());
    }

    #[test]
    fn test_solved_with_counts_at_u32_max() {
        let r: IterationRecord = serde_json::from_str(&format!(
            r#"{{"test_passed_private": {max}, "test_passed_generate": {max}}}"#,
            max = u32::MAX
        ))
        .unwrap();
        assert!(r.is_solved());
        let c = TierCounts {
            passed: u32::MAX,
            failed: 1,
            timed_out: 0,
        };
        assert_eq!(c.total(), u32::MAX);
    }

    #[test]
    fn test_public_tier_does_not_affect_solved() {
        let mut r = record(1, 1, 0, 0);
        r.failed_public = 5;
        r.timeout_public = 2;
        assert!(r.is_solved());
    }

    #[test]
    fn test_empty_record_round_trips_as_empty_object() {
        let r: IterationRecord = serde_json::from_str("{}").unwrap();
        assert!(r.is_empty());
        assert!(!serde_json::to_string(&r)
            .unwrap()
            .contains("number_of_llm_fixes_ai"));
    }

    #[test]
    fn test_record_uses_flat_field_names() {
        let json = r#"{
            "solution": "x = 1",
            "test_passed_private": 3,
            "test_failed_generate": 1,
            "number_of_llm_fixes_ai": 2
        }"#;
        let r: IterationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.passed_private, 3);
        assert_eq!(r.failed_generated, 1);
        assert_eq!(r.fixes_via_ai_tests, Some(2));
        assert_eq!(r.fixes_via_public_tests, None);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_set_and_get_counts() {
        let mut r = IterationRecord::default();
        let c = TierCounts {
            passed: 4,
            failed: 1,
            timed_out: 2,
        };
        r.set_counts(Tier::Generated, c);
        assert_eq!(r.counts(Tier::Generated), c);
        assert_eq!(r.counts(Tier::Private), TierCounts::default());
    }

    #[test]
    fn test_tally_counts_timeouts_separately() {
        let outcomes = vec![
            TestOutcome {
                passed: true,
                ..Default::default()
            },
            TestOutcome {
                timed_out: true,
                ..Default::default()
            },
            TestOutcome::default(),
        ];
        let c = TierCounts::tally(&outcomes);
        assert_eq!(
            c,
            TierCounts {
                passed: 1,
                failed: 1,
                timed_out: 1
            }
        );
        assert_eq!(c.total(), 3);
    }

    #[test]
    fn test_aux_test_accepts_string_or_list() {
        let one: AuxTest = serde_json::from_str(r#"{"input": "1 2", "output": "3"}"#).unwrap();
        assert_eq!(one.cases.len(), 1);
        assert_eq!(one.key(), vec!["1 2".to_string()]);

        let many: AuxTest =
            serde_json::from_str(r#"{"input": ["1", "2"], "output": ["a", "b"]}"#).unwrap();
        assert_eq!(many.cases.len(), 2);
        assert_eq!(many.cases[1].expected_output, "b");
    }

    #[test]
    fn test_problem_defaults_valid() {
        let p: Problem = serde_json::from_str(r#"{"name": "A. Sum"}"#).unwrap();
        assert!(p.is_valid_problem);
        assert!(p.public_tests.is_empty());
        assert!(p.ai_tests.is_empty());
    }

    #[test]
    fn test_problem_record_solved_if_any_iteration_solved() {
        let mut pr = ProblemRecord::default();
        pr.insert(0, record(0, 0, 0, 0));
        assert!(!pr.is_solved());
        pr.insert(1, record(1, 0, 0, 0));
        assert!(pr.is_solved());
        assert_eq!(pr.get(1).unwrap().passed_private, 1);
        assert!(pr.0.contains_key("iteration_1"));
    }
}
