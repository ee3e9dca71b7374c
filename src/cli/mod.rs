// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;

#[derive(Parser)]
#[command(
    name = "repairbench",
    about = "Solve a competitive-programming dataset with self-repairing candidates",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.repairbench/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Attempt every problem of a split, resuming from previous results
    Solve(SolveArgs),
    /// Show per-problem results from a results file
    Status {
        /// Results file (defaults to dataset.results_path)
        #[arg(long)]
        results: Option<PathBuf>,
        /// Only show this split
        #[arg(long)]
        split: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct SolveArgs {
    /// Dataset JSON file
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Split to solve
    #[arg(long)]
    pub split: Option<String>,

    /// Results file to resume from and write to
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Independent attempts per problem
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Round cap for the AI-test repair stage
    #[arg(long)]
    pub max_calls: Option<u32>,

    /// Suppress progress output
    #[arg(long)]
    pub quiet: bool,
}

impl SolveArgs {
    /// Layer command-line values over the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref path) = self.dataset {
            config.dataset.path = Some(path.clone());
        }
        if let Some(ref split) = self.split {
            config.dataset.split = split.clone();
        }
        if let Some(ref results) = self.results {
            config.dataset.results_path = results.clone();
        }
        if let Some(n) = self.iterations {
            config.dataset.num_iterations = n;
        }
        if let Some(n) = self.max_calls {
            config.repair.max_allowed_calls = n;
        }
    }
}
