//! `backtest`: simulate a signal series, deriving signals from a drift
//! forecast when the data has none.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use forecast_eval_backtest::{
    backtest_summary, BacktestSummary, Backtester, MetricTable, ReportFormatter,
};
use forecast_eval_core::{
    ConfidenceSizer, ForecastConfidenceSizer, ForecastKellySizer, KellySizer, PositionSizer,
    TimeSeriesFrame,
};
use forecast_eval_strategy::{one_step_forecasts, DriftForecaster, SignalSeries, ThresholdSignal};
use serde::Serialize;

use super::{load_config, load_frame, print_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SizerKind {
    /// Raw signal scaled by the maximum position
    Default,
    /// Confidence-scaled sizing from forecast confidence
    Confidence,
    /// Fractional Kelly sizing from forecast return and spread
    Kelly,
}

/// Arguments for the backtest command.
#[derive(Args, Debug, Clone)]
pub struct BacktestArgs {
    /// Input CSV; the first column is the index
    #[arg(short, long)]
    pub data: String,

    /// Price column
    #[arg(long, default_value = "close")]
    pub price_col: String,

    /// Signal column; derived from a drift forecast when absent
    #[arg(long, default_value = "signal")]
    pub signal_col: String,

    /// Position sizer
    #[arg(long, value_enum, default_value = "default")]
    pub sizer: SizerKind,

    /// Bars of history before the first derived forecast
    #[arg(long, default_value = "20")]
    pub min_history: usize,

    /// Minimum absolute forecast return for a derived signal
    #[arg(long, default_value = "0.0")]
    pub min_return: f64,

    /// Write the per-bar result table to this CSV
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct BacktestReport<'a> {
    summary: BacktestSummary,
    metrics: &'a MetricTable,
}

pub fn run_backtest(args: BacktestArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let data = load_frame(&args.data)?;
    let prices = data.require_column(&args.price_col)?.to_vec();

    let needs_forecasts = !data.has_column(&args.signal_col) || args.sizer != SizerKind::Default;
    let derived = if needs_forecasts {
        Some(derive_signals(&data, &args, &prices)?)
    } else {
        None
    };

    let signals = match (data.column(&args.signal_col), &derived) {
        (Some(signals), _) => signals.to_vec(),
        (None, Some(derived)) => {
            tracing::info!(
                "No '{}' column; using drift-forecast signals",
                args.signal_col
            );
            derived.signals.clone()
        }
        (None, None) => anyhow::bail!("Missing signal column '{}'", args.signal_col),
    };

    let sizer: Option<Box<dyn PositionSizer>> = match (args.sizer, derived) {
        (SizerKind::Default, _) | (_, None) => None,
        (SizerKind::Confidence, Some(derived)) => Some(Box::new(ForecastConfidenceSizer::new(
            ConfidenceSizer::default(),
            derived.confidences,
        ))),
        (SizerKind::Kelly, Some(derived)) => Some(Box::new(ForecastKellySizer::new(
            KellySizer::default(),
            derived.expected_returns,
            derived.return_stds,
        ))),
    };

    let mut backtester = Backtester::new(config.backtest);
    let signal_frame = TimeSeriesFrame::new(data.index().to_vec())
        .with_column("price", prices)?
        .with_column("signal", signals)?;
    let result = backtester.run_frame(
        &signal_frame,
        "price",
        "signal",
        sizer.as_deref(),
        None,
    )?;

    if let Some(path) = &args.output {
        result
            .to_frame()?
            .to_csv(path)
            .with_context(|| format!("Failed to write backtest results to {path}"))?;
        tracing::info!("Wrote backtest results to {}", path);
    }

    let metrics = backtest_summary(&result.returns(), None, &config.metrics)?;
    let summary = backtester.summary()?;

    if args.json {
        print_json(&BacktestReport {
            summary,
            metrics: &metrics,
        })?;
    } else {
        println!("{}", ReportFormatter::format_backtest(&summary));
        println!("{metrics}");
    }
    Ok(())
}

fn derive_signals(
    data: &TimeSeriesFrame,
    args: &BacktestArgs,
    prices: &[f64],
) -> Result<SignalSeries> {
    let forecaster = DriftForecaster::new(&args.price_col);
    let (predictions, stds) = one_step_forecasts(&forecaster, data, args.min_history, &())?;
    Ok(ThresholdSignal::new(args.min_return).generate(prices, &predictions, &stds)?)
}
