use std::collections::BTreeMap;

use anyhow::{bail, Result};
use forecast_eval_core::{Forecaster, Predictions, TimeSeriesFrame};
use serde::{Deserialize, Serialize};

use super::{sample_std, training_values, GaussianForecast};

/// Predicts the last observed value with the spread of one-step changes.
#[derive(Debug, Clone)]
pub struct NaiveForecaster {
    target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaiveModel {
    pub last: f64,
    /// Standard deviation of one-step differences in training.
    pub sigma: f64,
}

impl NaiveForecaster {
    #[must_use]
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }

    #[must_use]
    pub fn forecast(&self, model: &NaiveModel, horizon: usize) -> GaussianForecast {
        GaussianForecast {
            mean: vec![model.last; horizon],
            std: vec![model.sigma; horizon],
        }
    }
}

impl Forecaster for NaiveForecaster {
    type Model = NaiveModel;
    type Options = ();

    fn name(&self) -> &str {
        "naive"
    }

    fn fit(&self, train: &TimeSeriesFrame, _options: &()) -> Result<NaiveModel> {
        let values = training_values(train, &self.target, 1)?;
        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        Ok(NaiveModel {
            last: values[values.len() - 1],
            sigma: sample_std(&diffs),
        })
    }

    fn predict(&self, model: &NaiveModel, test: &TimeSeriesFrame) -> Result<Predictions> {
        Ok(self.forecast(model, test.len()).into_predictions(test)?)
    }

    fn describe(&self, model: &NaiveModel) -> Option<BTreeMap<String, String>> {
        Some(BTreeMap::from([
            ("last".to_string(), format!("{:.6}", model.last)),
            ("sigma".to_string(), format!("{:.6}", model.sigma)),
        ]))
    }
}

/// Repeats the last observed season.
#[derive(Debug, Clone)]
pub struct SeasonalNaiveForecaster {
    target: String,
    season: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalNaiveModel {
    /// The final `season` training values, oldest first.
    pub last_season: Vec<f64>,
    /// Standard deviation of seasonal differences in training.
    pub sigma: f64,
}

impl SeasonalNaiveForecaster {
    /// # Errors
    ///
    /// Returns an error for a zero season length.
    pub fn new(target: &str, season: usize) -> Result<Self> {
        if season == 0 {
            bail!("season length must be at least 1");
        }
        Ok(Self {
            target: target.to_string(),
            season,
        })
    }

    #[must_use]
    pub fn season(&self) -> usize {
        self.season
    }

    #[must_use]
    pub fn forecast(&self, model: &SeasonalNaiveModel, horizon: usize) -> GaussianForecast {
        let season = model.last_season.len();
        GaussianForecast {
            mean: (0..horizon).map(|h| model.last_season[h % season]).collect(),
            std: vec![model.sigma; horizon],
        }
    }
}

impl Forecaster for SeasonalNaiveForecaster {
    type Model = SeasonalNaiveModel;
    type Options = ();

    fn name(&self) -> &str {
        "seasonal_naive"
    }

    fn fit(&self, train: &TimeSeriesFrame, _options: &()) -> Result<SeasonalNaiveModel> {
        let values = training_values(train, &self.target, self.season + 1)?;
        let diffs: Vec<f64> = values
            .iter()
            .skip(self.season)
            .zip(&values)
            .map(|(now, before)| now - before)
            .collect();
        Ok(SeasonalNaiveModel {
            last_season: values[values.len() - self.season..].to_vec(),
            sigma: sample_std(&diffs),
        })
    }

    fn predict(&self, model: &SeasonalNaiveModel, test: &TimeSeriesFrame) -> Result<Predictions> {
        Ok(self.forecast(model, test.len()).into_predictions(test)?)
    }

    fn describe(&self, model: &SeasonalNaiveModel) -> Option<BTreeMap<String, String>> {
        Some(BTreeMap::from([
            ("season".to_string(), self.season.to_string()),
            ("sigma".to_string(), format!("{:.6}", model.sigma)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_eval_core::PREDICTION_COLUMN;

    fn frame(values: Vec<f64>) -> TimeSeriesFrame {
        TimeSeriesFrame::with_positions(values.len())
            .with_column("y", values)
            .unwrap()
    }

    #[test]
    fn naive_predicts_last_value() {
        let forecaster = NaiveForecaster::new("y");
        let model = forecaster.fit(&frame(vec![1.0, 3.0, 2.0, 4.0]), &()).unwrap();
        assert_eq!(model.last, 4.0);
        // diffs 2, -1, 2: sample std sqrt(3)
        assert!((model.sigma - 3.0_f64.sqrt()).abs() < 1e-12);

        let Predictions::Table(table) = forecaster.predict(&model, &frame(vec![0.0; 3])).unwrap()
        else {
            panic!("expected a table");
        };
        assert_eq!(table.column(PREDICTION_COLUMN).unwrap(), &[4.0, 4.0, 4.0]);
    }

    #[test]
    fn naive_single_value_has_zero_spread() {
        let model = NaiveForecaster::new("y").fit(&frame(vec![5.0]), &()).unwrap();
        assert_eq!(model.sigma, 0.0);
    }

    #[test]
    fn naive_requires_target_column() {
        assert!(NaiveForecaster::new("close").fit(&frame(vec![1.0]), &()).is_err());
    }

    #[test]
    fn seasonal_naive_repeats_last_season() {
        let forecaster = SeasonalNaiveForecaster::new("y", 3).unwrap();
        let model = forecaster
            .fit(&frame(vec![1.0, 2.0, 3.0, 1.5, 2.5, 3.5]), &())
            .unwrap();
        assert_eq!(model.last_season, vec![1.5, 2.5, 3.5]);
        // seasonal differences are all 0.5
        assert!(model.sigma.abs() < 1e-12);

        let forecast = forecaster.forecast(&model, 5);
        assert_eq!(forecast.mean, vec![1.5, 2.5, 3.5, 1.5, 2.5]);
    }

    #[test]
    fn seasonal_naive_needs_more_than_one_season() {
        let forecaster = SeasonalNaiveForecaster::new("y", 4).unwrap();
        assert!(forecaster.fit(&frame(vec![1.0, 2.0, 3.0, 4.0]), &()).is_err());
        assert!(SeasonalNaiveForecaster::new("y", 0).is_err());
    }
}
