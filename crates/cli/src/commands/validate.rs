//! `validate`: walk-forward validation of a baseline forecaster.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use forecast_eval_backtest::{
    MetricRegistry, ReportFormatter, ValidationSummary, WalkForwardValidator,
};
use forecast_eval_core::{Forecaster, TimeSeriesFrame, ValidationConfig, WindowMethod};
use forecast_eval_strategy::{
    DriftForecaster, NaiveForecaster, RollingMeanForecaster, SeasonalNaiveForecaster,
};

use super::{load_config, load_frame, print_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Naive,
    Seasonal,
    Drift,
    RollingMean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Expanding,
    Rolling,
}

impl From<MethodArg> for WindowMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Expanding => Self::Expanding,
            MethodArg::Rolling => Self::Rolling,
        }
    }
}

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Input CSV; the first column is the index
    #[arg(short, long)]
    pub data: String,

    /// Column to forecast
    #[arg(short, long)]
    pub target: String,

    /// Baseline model
    #[arg(short, long, value_enum, default_value = "naive")]
    pub model: ModelKind,

    /// Season length for the seasonal model
    #[arg(long, default_value = "5")]
    pub season: usize,

    /// Window for the rolling-mean model
    #[arg(long, default_value = "20")]
    pub window: usize,

    /// Number of folds (overrides config)
    #[arg(long)]
    pub folds: Option<usize>,

    /// Observations per test window (overrides config)
    #[arg(long)]
    pub test_size: Option<usize>,

    /// Observations skipped between train and test (overrides config)
    #[arg(long)]
    pub gap: Option<usize>,

    /// Window method (overrides config)
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Fixed training size for rolling windows (overrides config)
    #[arg(long)]
    pub train_size: Option<usize>,

    /// Reuse the first fold's model instead of refitting
    #[arg(long)]
    pub no_refit: bool,

    /// Metrics scored per fold (mae, rmse, mape, smape); defaults to MAE and RMSE
    #[arg(long, value_delimiter = ',')]
    pub metrics: Vec<String>,

    /// Write all fold predictions to this CSV
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateArgs {
    fn validation_config(&self, mut config: ValidationConfig) -> ValidationConfig {
        if let Some(folds) = self.folds {
            config.n_folds = folds;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(gap) = self.gap {
            config.gap = gap;
        }
        if let Some(method) = self.method {
            config.method = method.into();
        }
        if self.train_size.is_some() {
            config.train_size = self.train_size;
        }
        if self.no_refit {
            config.refit = false;
        }
        config
    }
}

pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let validation = args.validation_config(config.validation);
    let registry = if args.metrics.is_empty() {
        MetricRegistry::default()
    } else {
        MetricRegistry::from_names(&args.metrics, &config.metrics)?
    };
    let data = load_frame(&args.data)?;

    tracing::info!(
        "Validating {:?} on '{}' with {} {} folds",
        args.model,
        args.target,
        validation.n_folds,
        validation.method
    );

    let mut validator = WalkForwardValidator::new(validation);
    let summary = match args.model {
        ModelKind::Naive => evaluate(
            &mut validator,
            &data,
            &NaiveForecaster::new(&args.target),
            &args.target,
            &registry,
        )?,
        ModelKind::Seasonal => evaluate(
            &mut validator,
            &data,
            &SeasonalNaiveForecaster::new(&args.target, args.season)?,
            &args.target,
            &registry,
        )?,
        ModelKind::Drift => evaluate(
            &mut validator,
            &data,
            &DriftForecaster::new(&args.target),
            &args.target,
            &registry,
        )?,
        ModelKind::RollingMean => evaluate(
            &mut validator,
            &data,
            &RollingMeanForecaster::new(&args.target, args.window)?,
            &args.target,
            &registry,
        )?,
    };

    if let Some(path) = &args.output {
        validator
            .all_predictions()?
            .to_csv(path)
            .with_context(|| format!("Failed to write predictions to {path}"))?;
        tracing::info!("Wrote fold predictions to {}", path);
    }

    if args.json {
        print_json(&summary)?;
    } else {
        println!("{}", ReportFormatter::format_validation(&summary));
    }
    Ok(())
}

fn evaluate<F: Forecaster<Options = ()>>(
    validator: &mut WalkForwardValidator,
    data: &TimeSeriesFrame,
    forecaster: &F,
    target: &str,
    registry: &MetricRegistry,
) -> Result<ValidationSummary> {
    validator.validate(data, forecaster, target, Some(registry), &())?;
    Ok(validator.summary()?)
}
