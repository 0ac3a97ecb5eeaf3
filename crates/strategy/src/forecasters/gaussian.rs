//! Gaussian predictive distributions shared by the baseline forecasters.

use forecast_eval_backtest::metrics::stats::normal_quantile;
use forecast_eval_backtest::PredictiveSamples;
use forecast_eval_core::{EvalError, Predictions, TimeSeriesFrame, PREDICTION_COLUMN};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const STD_COLUMN: &str = "std";
pub const LOWER_COLUMN: &str = "lower";
pub const UPPER_COLUMN: &str = "upper";

/// Nominal coverage of the `lower`/`upper` columns.
pub const INTERVAL_LEVEL: f64 = 0.95;

/// Per-step Gaussian forecast: a mean and a standard deviation per row.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianForecast {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl GaussianForecast {
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Central interval bounds at [`INTERVAL_LEVEL`].
    #[must_use]
    pub fn interval(&self) -> (Vec<f64>, Vec<f64>) {
        let z = normal_quantile(0.5 + INTERVAL_LEVEL / 2.0);
        self.mean
            .iter()
            .zip(&self.std)
            .map(|(m, s)| (m - z * s, m + z * s))
            .unzip()
    }

    /// Table over `test`'s index with `prediction`, `std`, `lower` and
    /// `upper` columns.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the forecast does not cover every test row.
    pub fn to_table(&self, test: &TimeSeriesFrame) -> Result<TimeSeriesFrame, EvalError> {
        let (lower, upper) = self.interval();
        TimeSeriesFrame::new(test.index().to_vec())
            .with_column(PREDICTION_COLUMN, self.mean.clone())?
            .with_column(STD_COLUMN, self.std.clone())?
            .with_column(LOWER_COLUMN, lower)?
            .with_column(UPPER_COLUMN, upper)
    }

    /// # Errors
    ///
    /// Returns `LengthMismatch` if the forecast does not cover every test row.
    pub fn into_predictions(self, test: &TimeSeriesFrame) -> Result<Predictions, EvalError> {
        Ok(Predictions::Table(self.to_table(test)?))
    }

    /// Draws `n_draws` samples per row from a seeded `ChaCha8Rng`.
    #[must_use]
    pub fn sample(&self, n_draws: usize, seed: u64) -> PredictiveSamples {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let draws = self
            .mean
            .iter()
            .zip(&self.std)
            .map(|(m, s)| (0..n_draws).map(|_| m + s * standard_normal(&mut rng)).collect())
            .collect();
        PredictiveSamples::per_observation(draws)
    }

    /// Reads a forecast back from a prediction table.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` if `prediction` or `std` is absent.
    pub fn from_table(table: &TimeSeriesFrame) -> Result<Self, EvalError> {
        Ok(Self {
            mean: table.require_column(PREDICTION_COLUMN)?.to_vec(),
            std: table.require_column(STD_COLUMN)?.to_vec(),
        })
    }
}

/// Box-Muller transform over two uniform draws.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
