//! Baseline `Forecaster` implementations.
//!
//! Every baseline reads a single target column, ignores fit options and
//! returns a Gaussian prediction table (`prediction`, `std`, `lower`,
//! `upper`) over the test index.

pub mod drift;
pub mod gaussian;
pub mod naive;
pub mod rolling_mean;

pub use drift::{DriftForecaster, DriftModel};
pub use gaussian::{GaussianForecast, LOWER_COLUMN, STD_COLUMN, UPPER_COLUMN};
pub use naive::{NaiveForecaster, NaiveModel, SeasonalNaiveForecaster, SeasonalNaiveModel};
pub use rolling_mean::{RollingMeanForecaster, RollingMeanModel};

use anyhow::{bail, Result};
use forecast_eval_core::TimeSeriesFrame;

/// Non-NaN values of `column`, erroring when fewer than `min_len` remain.
pub(crate) fn training_values(train: &TimeSeriesFrame, column: &str, min_len: usize) -> Result<Vec<f64>> {
    let values: Vec<f64> = train
        .require_column(column)?
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if values.len() < min_len {
        bail!(
            "{} needs at least {} training values, got {}",
            column,
            min_len,
            values.len()
        );
    }
    Ok(values)
}

/// Sample standard deviation, or 0 for fewer than two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    let std = forecast_eval_backtest::metrics::stats::std_dev(values, 1);
    if std.is_nan() {
        0.0
    } else {
        std
    }
}
