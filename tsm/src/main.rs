// tsm/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use tsm_core::TsmError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG=debug tsm load ... to see schema detection details
    let default_level = if cli.global.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let global = cli.global;
    let result = match cli.command {
        Commands::Load { file, year } => commands::load::execute(&global, file, year).await,
        Commands::Rank {
            year,
            dataset,
            category,
            limit,
        } => commands::rank::execute(&global, year, &dataset, category, limit).await,
        Commands::Priority {
            provider,
            year,
            dataset,
        } => commands::priority::execute(&global, &provider, year, dataset.as_deref()).await,
        Commands::Momentum {
            provider,
            from,
            to,
            dataset,
        } => commands::momentum::execute(&global, &provider, from, to, dataset.as_deref()).await,
        Commands::Validate { year } => commands::validate::execute(&global, year).await,
        Commands::Inspect { table, limit } => commands::inspect::execute(&global, &table, limit),
    };

    if let Err(e) = result {
        report(e);
        std::process::exit(1);
    }
}

/// Core errors carry miette diagnostics (codes + help); everything else prints its context chain.
fn report(error: anyhow::Error) {
    match error.downcast::<TsmError>() {
        Ok(TsmError::Domain(e)) => eprintln!("\n{:?}", miette::Report::new(e)),
        Ok(TsmError::Infrastructure(e)) => eprintln!("\n{:?}", miette::Report::new(e)),
        Ok(other) => eprintln!("\n💥 {}", other),
        Err(e) => eprintln!("\n💥 {:#}", e),
    }
}
