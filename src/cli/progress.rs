// src/cli/progress.rs — Terminal progress renderer for run feedback

use crate::core::types::ProgressEvent;

fn render(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStart {
            split,
            problems,
            resumed,
        } => format!(
            "[run] split '{}': {} problem(s), {} already solved",
            split, problems, resumed
        ),
        ProgressEvent::ProblemSkipped { problem } => {
            format!("[{}] skipped (invalid problem)", problem)
        }
        ProgressEvent::ProblemStart { problem, name } => format!("[{}] {}", problem, name),
        ProgressEvent::IterationEnd {
            problem,
            iteration,
            solved,
            resumed,
        } => format!(
            "[{}]   iteration {}: {}{}",
            problem,
            iteration,
            if *solved { "solved" } else { "unsolved" },
            if *resumed { " (resumed)" } else { "" },
        ),
        ProgressEvent::ProblemEnd { problem, solved } => format!(
            "[{}] {}",
            problem,
            if *solved { "SOLVED" } else { "not solved" }
        ),
        ProgressEvent::ProblemFailed { problem, error } => {
            format!("[{}] failed: {}", problem, error)
        }
        ProgressEvent::Complete { summary } => format!(
            "[done] attempted={} solved={} skipped={} failed={}",
            summary.attempted, summary.solved, summary.skipped, summary.failed
        ),
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean.
/// Returns a closure suitable for `DatasetOrchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", render(&event))
}
