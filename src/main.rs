// src/main.rs — repairbench entry point

use clap::Parser;

use repairbench::cli::{Cli, Commands};
use repairbench::infra::config::Config;
use repairbench::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects RUST_LOG, falls back to --log-level
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Solve(args) => {
            repairbench::cli::run::run_solve(config, args).await?;
        }
        Commands::Status { results, split } => {
            let path = results.unwrap_or_else(|| config.dataset.results_path.clone());
            repairbench::cli::status::show_status(&path, split.as_deref())?;
        }
    }
    Ok(())
}
