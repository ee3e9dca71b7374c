// src/cli/status.rs — Results summary display

use std::path::Path;

use crate::core::types::ProblemRecord;
use crate::results::ResultsStore;

/// One line per problem plus a per-split total.
pub fn render_status(store: &ResultsStore, split: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    let splits: Vec<&str> = match split {
        Some(s) => vec![s],
        None => store.splits().collect(),
    };

    for name in splits {
        let Some(records) = store.split(name) else {
            lines.push(format!("{name}: no results"));
            continue;
        };
        let solved = records.values().filter(|r| r.is_solved()).count();
        lines.push(format!(
            "{name}: {solved}/{} problem(s) solved",
            records.len()
        ));
        for (number, record) in records {
            lines.push(format!("  {:>5}  {}", number, describe(record)));
        }
    }
    lines
}

fn describe(record: &ProblemRecord) -> String {
    let solved_in: Vec<&str> = record
        .iter()
        .filter(|(_, r)| r.is_solved())
        .map(|(k, _)| k.as_str())
        .collect();
    if solved_in.is_empty() {
        format!("unsolved ({} iteration(s))", record.len())
    } else {
        format!("solved in {}", solved_in.join(", "))
    }
}

pub fn show_status(results_path: &Path, split: Option<&str>) -> anyhow::Result<()> {
    if !results_path.exists() {
        println!("No results at {}", results_path.display());
        return Ok(());
    }
    let store = ResultsStore::load(results_path)?;
    println!("Results: {}", results_path.display());
    for line in render_status(&store, split) {
        println!("{line}");
    }
    Ok(())
}
