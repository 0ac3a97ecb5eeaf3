use clap::{Parser, Subcommand};

mod commands;

use commands::{BacktestArgs, ScoreArgs, ValidateArgs};

#[derive(Parser)]
#[command(name = "forecast-eval")]
#[command(about = "Walk-forward validation, forecast scoring and backtesting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run walk-forward validation of a baseline model
    Validate(ValidateArgs),
    /// Backtest a signal series or forecast-derived signals
    Backtest(BacktestArgs),
    /// Score a table of predictions against actuals
    Score(ScoreArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate(args) => commands::run_validate(args)?,
        Commands::Backtest(args) => commands::run_backtest(args)?,
        Commands::Score(args) => commands::run_score(args)?,
    }

    Ok(())
}
