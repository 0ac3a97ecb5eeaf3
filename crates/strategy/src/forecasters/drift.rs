use std::collections::BTreeMap;

use anyhow::Result;
use forecast_eval_core::{Forecaster, Predictions, TimeSeriesFrame};
use serde::{Deserialize, Serialize};

use super::{sample_std, training_values, GaussianForecast};

/// Random walk with drift: extends the line from the first to the last
/// training value. Predictive spread grows with the square root of the
/// horizon.
#[derive(Debug, Clone)]
pub struct DriftForecaster {
    target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftModel {
    pub last: f64,
    /// Mean one-step change.
    pub slope: f64,
    /// One-step residual standard deviation around the drift.
    pub sigma: f64,
}

impl DriftForecaster {
    #[must_use]
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn forecast(&self, model: &DriftModel, horizon: usize) -> GaussianForecast {
        let steps = (1..=horizon).map(|h| h as f64);
        GaussianForecast {
            mean: steps.clone().map(|h| model.last + h * model.slope).collect(),
            std: steps.map(|h| model.sigma * h.sqrt()).collect(),
        }
    }
}

impl Forecaster for DriftForecaster {
    type Model = DriftModel;
    type Options = ();

    fn name(&self) -> &str {
        "drift"
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&self, train: &TimeSeriesFrame, _options: &()) -> Result<DriftModel> {
        let values = training_values(train, &self.target, 2)?;
        let first = values[0];
        let last = values[values.len() - 1];
        let slope = (last - first) / (values.len() - 1) as f64;

        let residuals: Vec<f64> = values.windows(2).map(|w| w[1] - w[0] - slope).collect();
        Ok(DriftModel {
            last,
            slope,
            sigma: sample_std(&residuals),
        })
    }

    fn predict(&self, model: &DriftModel, test: &TimeSeriesFrame) -> Result<Predictions> {
        Ok(self.forecast(model, test.len()).into_predictions(test)?)
    }

    fn describe(&self, model: &DriftModel) -> Option<BTreeMap<String, String>> {
        Some(BTreeMap::from([
            ("slope".to_string(), format!("{:.6}", model.slope)),
            ("sigma".to_string(), format!("{:.6}", model.sigma)),
        ]))
    }
}
