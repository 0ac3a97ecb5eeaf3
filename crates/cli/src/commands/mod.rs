//! CLI subcommands.

pub mod backtest;
pub mod score;
pub mod validate;

pub use backtest::{run_backtest, BacktestArgs};
pub use score::{run_score, ScoreArgs};
pub use validate::{run_validate, ValidateArgs};

use anyhow::{Context, Result};
use forecast_eval_core::{AppConfig, ConfigLoader, TimeSeriesFrame};
use serde::Serialize;

/// Loads configuration with `path` as the TOML layer.
pub(crate) fn load_config(path: &str) -> Result<AppConfig> {
    ConfigLoader::load_from(path).with_context(|| format!("Failed to load config from {path}"))
}

pub(crate) fn load_frame(path: &str) -> Result<TimeSeriesFrame> {
    let frame =
        TimeSeriesFrame::from_csv(path).with_context(|| format!("Failed to load data: {path}"))?;
    tracing::info!("Loaded {} rows from {}", frame.len(), path);
    Ok(frame)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
