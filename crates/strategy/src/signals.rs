//! Turning forecasts into trading signals.
//!
//! `forecasts[t]` is the forecast made at bar `t` for bar `t + 1`, so the
//! signal at bar `t` only uses information available at `t`.

use anyhow::Result;
use forecast_eval_backtest::metrics::stats::normal_cdf;
use forecast_eval_core::{
    signal_direction, EvalError, Forecaster, Predictions, TimeSeriesFrame, PREDICTION_COLUMN,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forecasters::STD_COLUMN;

/// Forecast-derived signal at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    /// `1.0` long, `-1.0` short, `0.0` flat.
    pub direction: f64,
    /// Probability that the realised return has the forecast's sign.
    pub confidence: f64,
    pub expected_return: f64,
    pub return_std: f64,
}

impl SignalPoint {
    const FLAT: Self = Self {
        direction: 0.0,
        confidence: 0.0,
        expected_return: f64::NAN,
        return_std: f64::NAN,
    };
}

/// Per-bar signals with the inputs position sizers need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub signals: Vec<f64>,
    pub confidences: Vec<f64>,
    pub expected_returns: Vec<f64>,
    pub return_stds: Vec<f64>,
}

impl SignalSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    fn push(&mut self, point: SignalPoint) {
        self.signals.push(point.direction);
        self.confidences.push(point.confidence);
        self.expected_returns.push(point.expected_return);
        self.return_stds.push(point.return_std);
    }
}

/// Goes long or short when the forecast return clears `min_return` in
/// absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSignal {
    pub min_return: f64,
}

impl Default for ThresholdSignal {
    fn default() -> Self {
        Self { min_return: 0.0 }
    }
}

impl ThresholdSignal {
    #[must_use]
    pub const fn new(min_return: f64) -> Self {
        Self { min_return }
    }

    /// Signal from a forecast of the next price given the current one.
    ///
    /// Confidence is `Φ(|μ| / σ)` over the forecast return. A zero spread
    /// gives full confidence in any non-zero move. Missing inputs are flat.
    #[must_use]
    pub fn evaluate(&self, price: f64, predicted: f64, predicted_std: f64) -> SignalPoint {
        if !(price > 0.0) || predicted.is_nan() {
            return SignalPoint::FLAT;
        }

        let expected_return = predicted / price - 1.0;
        let return_std = predicted_std / price;
        let confidence = if return_std > 0.0 {
            normal_cdf(expected_return.abs() / return_std)
        } else if expected_return != 0.0 {
            1.0
        } else {
            0.5
        };

        let direction = if expected_return.abs() > self.min_return {
            signal_direction(expected_return)
        } else {
            0.0
        };

        SignalPoint {
            direction,
            confidence,
            expected_return,
            return_std,
        }
    }

    /// Signals for every bar from aligned prices and one-step forecasts.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the series are not aligned.
    pub fn generate(
        &self,
        prices: &[f64],
        predictions: &[f64],
        predicted_stds: &[f64],
    ) -> Result<SignalSeries, EvalError> {
        EvalError::check_len(prices.len(), predictions.len())?;
        EvalError::check_len(prices.len(), predicted_stds.len())?;

        let mut series = SignalSeries::default();
        for ((&price, &predicted), &std) in prices.iter().zip(predictions).zip(predicted_stds) {
            series.push(self.evaluate(price, predicted, std));
        }
        Ok(series)
    }
}

/// Expanding-window one-step-ahead forecasts over `data`.
///
/// For each bar `t >= min_history - 1` the forecaster is fitted on rows
/// `0..=t` and asked for the next row. The test slice passed to `predict`
/// carries only the next row's index label, never its values. The last bar
/// and bars with too little history are `NaN`.
///
/// # Errors
///
/// Returns any fit or predict error, and `MissingColumn` when a
/// prediction table has no `prediction` column.
pub fn one_step_forecasts<F: Forecaster>(
    forecaster: &F,
    data: &TimeSeriesFrame,
    min_history: usize,
    options: &F::Options,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let n = data.len();
    let mut predictions = vec![f64::NAN; n];
    let mut stds = vec![f64::NAN; n];

    for t in min_history.max(1) - 1..n.saturating_sub(1) {
        let train = data.slice(0..t + 1);
        let next = TimeSeriesFrame::new(data.slice(t + 1..t + 2).index().to_vec());

        let model = forecaster.fit(&train, options)?;
        match forecaster.predict(&model, &next)? {
            Predictions::Point(values) => {
                predictions[t] = values.first().copied().unwrap_or(f64::NAN);
            }
            Predictions::Table(table) => {
                predictions[t] = table.require_column(PREDICTION_COLUMN)?[0];
                stds[t] = table.column(STD_COLUMN).map_or(f64::NAN, |s| s[0]);
            }
        }
    }

    debug!(
        "Generated {} one-step forecasts with {}",
        predictions.iter().filter(|p| !p.is_nan()).count(),
        forecaster.name()
    );
    Ok((predictions, stds))
}
