// src/evaluator/utils.rs — Output comparison and failure reports

use crate::core::types::{TestCase, TestOutcome};
use crate::util::clip;

/// Longest slice of program output quoted in a failure report.
const MAX_REPORT_FIELD: usize = 2_000;

/// Normalize program output: trailing whitespace per line and trailing blank
/// lines are not significant.
pub fn normalize_output(s: &str) -> String {
    let lines: Vec<&str> = s.lines().map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    lines[..end].join("\n")
}

pub fn outputs_match(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Human-readable evidence for a failing case, as handed to the fixer.
pub fn failure_report(case: &TestCase, outcome: &TestOutcome) -> String {
    let mut report = format!(
        "test input:\n{}\nexpected output:\n{}\n",
        clip(&case.input, MAX_REPORT_FIELD),
        clip(&case.expected_output, MAX_REPORT_FIELD),
    );
    if outcome.timed_out {
        report.push_str("code timed out before producing a complete answer\n");
    } else {
        report.push_str(&format!(
            "code output:\n{}\n",
            clip(&outcome.actual_output, MAX_REPORT_FIELD)
        ));
    }
    if let Some(ref err) = outcome.error_text {
        report.push_str(&format!(
            "error:\n{}\n",
            clip(err, MAX_REPORT_FIELD)
        ));
    }
    report
}
