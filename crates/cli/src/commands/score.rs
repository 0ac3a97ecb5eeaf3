//! `score`: forecast metrics for a table of predictions.

use anyhow::Result;
use clap::Args;
use forecast_eval_backtest::{forecast_summary, ForecastInputs, PredictiveSamples};
use forecast_eval_strategy::GaussianForecast;

use super::{load_config, load_frame, print_json};

/// Arguments for the score command.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Input CSV; the first column is the index
    #[arg(short, long)]
    pub data: String,

    /// Actual values column
    #[arg(long, default_value = "actual")]
    pub actual_col: String,

    /// Point prediction column
    #[arg(long, default_value = "prediction")]
    pub prediction_col: String,

    /// Interval lower bound column, used when present
    #[arg(long, default_value = "lower")]
    pub lower_col: String,

    /// Interval upper bound column, used when present
    #[arg(long, default_value = "upper")]
    pub upper_col: String,

    /// Predictive std column; Gaussian draws are scored when present
    #[arg(long, default_value = "std")]
    pub std_col: String,

    /// Draws per observation for sample-based metrics
    #[arg(long, default_value = "1000")]
    pub draws: usize,

    /// Seed for the predictive draws
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Training CSV for MASE; read from the same actual column
    #[arg(long)]
    pub train: Option<String>,

    /// Seasonal lag for the MASE scale
    #[arg(long, default_value = "1")]
    pub seasonality: usize,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Print the metrics as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_score(args: ScoreArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let data = load_frame(&args.data)?;

    let actual = data.require_column(&args.actual_col)?;
    let predicted = data.require_column(&args.prediction_col)?;

    let samples: Option<PredictiveSamples> = data.column(&args.std_col).map(|std| {
        tracing::info!(
            "Scoring {} Gaussian draws per observation from '{}'",
            args.draws,
            args.std_col
        );
        GaussianForecast {
            mean: predicted.to_vec(),
            std: std.to_vec(),
        }
        .sample(args.draws, args.seed)
    });

    let training = match &args.train {
        Some(path) => Some(load_frame(path)?.require_column(&args.actual_col)?.to_vec()),
        None => None,
    };

    let mut inputs = ForecastInputs::new(actual, predicted);
    if let Some(samples) = &samples {
        inputs = inputs.with_samples(samples);
    }
    if let (Some(lower), Some(upper)) =
        (data.column(&args.lower_col), data.column(&args.upper_col))
    {
        inputs = inputs.with_interval(lower, upper);
    }
    if let Some(training) = &training {
        inputs = inputs.with_training(training, args.seasonality);
    }

    let table = forecast_summary(&inputs, &config.metrics)?;
    if args.json {
        print_json(&table)?;
    } else {
        println!("{table}");
    }
    Ok(())
}
