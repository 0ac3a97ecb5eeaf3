use std::collections::BTreeMap;

use anyhow::{bail, Result};
use forecast_eval_backtest::metrics::stats::mean;
use forecast_eval_core::{Forecaster, Predictions, TimeSeriesFrame};
use serde::{Deserialize, Serialize};

use super::{sample_std, training_values, GaussianForecast};

/// Mean and spread of the trailing `window` training values.
#[derive(Debug, Clone)]
pub struct RollingMeanForecaster {
    target: String,
    window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingMeanModel {
    pub mean: f64,
    pub sigma: f64,
    /// Values actually averaged (shorter than the window early on).
    pub observations: usize,
}

impl RollingMeanForecaster {
    /// # Errors
    ///
    /// Returns an error for a zero window.
    pub fn new(target: &str, window: usize) -> Result<Self> {
        if window == 0 {
            bail!("rolling window must be at least 1");
        }
        Ok(Self {
            target: target.to_string(),
            window,
        })
    }

    #[must_use]
    pub fn forecast(&self, model: &RollingMeanModel, horizon: usize) -> GaussianForecast {
        GaussianForecast {
            mean: vec![model.mean; horizon],
            std: vec![model.sigma; horizon],
        }
    }
}

impl Forecaster for RollingMeanForecaster {
    type Model = RollingMeanModel;
    type Options = ();

    fn name(&self) -> &str {
        "rolling_mean"
    }

    fn fit(&self, train: &TimeSeriesFrame, _options: &()) -> Result<RollingMeanModel> {
        let values = training_values(train, &self.target, 1)?;
        let tail = &values[values.len().saturating_sub(self.window)..];
        Ok(RollingMeanModel {
            mean: mean(tail),
            sigma: sample_std(tail),
            observations: tail.len(),
        })
    }

    fn predict(&self, model: &RollingMeanModel, test: &TimeSeriesFrame) -> Result<Predictions> {
        Ok(self.forecast(model, test.len()).into_predictions(test)?)
    }

    fn describe(&self, model: &RollingMeanModel) -> Option<BTreeMap<String, String>> {
        Some(BTreeMap::from([
            ("window".to_string(), self.window.to_string()),
            ("observations".to_string(), model.observations.to_string()),
        ]))
    }
}
