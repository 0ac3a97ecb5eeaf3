//! Proper scoring rules and calibration diagnostics for probabilistic
//! forecasts.

use forecast_eval_core::EvalError;
use serde::{Deserialize, Serialize};

use super::stats::{mean, normal_cdf, normal_log_pdf, normal_pdf};

/// Predictive draws grouped per observation.
///
/// Sample matrices arrive in either orientation. `from_matrix` treats the
/// rows as draws when the row length equals the observation count
/// (draws x obs) and as observations otherwise (obs x draws). When both
/// dimensions equal the observation count the matrix is read as draws x obs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveSamples {
    per_observation: Vec<Vec<f64>>,
}

impl PredictiveSamples {
    /// Wraps draws that are already grouped per observation.
    #[must_use]
    pub fn per_observation(per_observation: Vec<Vec<f64>>) -> Self {
        Self { per_observation }
    }

    /// Builds samples from a rectangular matrix, detecting its orientation.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the matrix is ragged or neither dimension
    /// matches `n_obs`.
    pub fn from_matrix(rows: &[Vec<f64>], n_obs: usize) -> Result<Self, EvalError> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(EvalError::LengthMismatch {
                expected: width,
                actual: bad.len(),
            });
        }

        if width == n_obs && !rows.is_empty() {
            let per_observation = (0..n_obs)
                .map(|obs| rows.iter().map(|draw| draw[obs]).collect())
                .collect();
            return Ok(Self { per_observation });
        }

        EvalError::check_len(n_obs, rows.len())?;
        Ok(Self {
            per_observation: rows.to_vec(),
        })
    }

    /// Builds samples from a flat vector of draws for a single observation.
    #[must_use]
    pub fn single(draws: Vec<f64>) -> Self {
        Self {
            per_observation: vec![draws],
        }
    }

    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.per_observation.len()
    }

    #[must_use]
    pub fn draws(&self, obs: usize) -> Option<&[f64]> {
        self.per_observation.get(obs).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.per_observation.iter().map(Vec::as_slice)
    }
}

/// CRPS of one observation from its predictive draws.
///
/// `E|X - y| - 0.5 E|X - X'|`, with the pairwise term computed from sorted
/// draws: `sum_i x_(i) (2i - n + 1) / n^2` equals `0.5 * mean |x_i - x_j|`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn crps_from_draws(draws: &[f64], actual: f64) -> f64 {
    if draws.is_empty() {
        return f64::NAN;
    }
    let n = draws.len() as f64;
    let term1 = draws.iter().map(|x| (x - actual).abs()).sum::<f64>() / n;

    let mut sorted = draws.to_vec();
    sorted.sort_by(f64::total_cmp);
    let half_pairwise = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| x * (2.0 * i as f64 - n + 1.0))
        .sum::<f64>()
        / (n * n);

    term1 - half_pairwise
}

/// Mean sample-based CRPS across observations (lower is better).
#[must_use]
pub fn crps(actual: &[f64], samples: &PredictiveSamples) -> f64 {
    let values: Vec<f64> = actual
        .iter()
        .zip(samples.iter())
        .map(|(&y, draws)| crps_from_draws(draws, y))
        .collect();
    mean(&values)
}

/// Mean closed-form CRPS for Gaussian predictive distributions.
///
/// A zero standard deviation is a point mass, whose CRPS is `|actual - mean|`.
#[must_use]
pub fn crps_gaussian(actual: &[f64], mean_pred: &[f64], std_pred: &[f64]) -> f64 {
    let inv_sqrt_pi = 1.0 / std::f64::consts::PI.sqrt();
    let values: Vec<f64> = actual
        .iter()
        .zip(mean_pred)
        .zip(std_pred)
        .map(|((&y, &mu), &sigma)| {
            if sigma == 0.0 {
                return (y - mu).abs();
            }
            let z = (y - mu) / sigma;
            sigma * (z * (2.0 * normal_cdf(z) - 1.0) + 2.0 * normal_pdf(z) - inv_sqrt_pi)
        })
        .collect();
    mean(&values)
}

/// Mean Gaussian log-likelihood of the actuals (higher is better).
#[must_use]
pub fn log_likelihood(actual: &[f64], mean_pred: &[f64], std_pred: &[f64]) -> f64 {
    let values: Vec<f64> = actual
        .iter()
        .zip(mean_pred)
        .zip(std_pred)
        .map(|((&y, &mu), &sigma)| normal_log_pdf(y, mu, sigma))
        .collect();
    mean(&values)
}

/// Fraction of actuals inside `[lower, upper]` (bounds inclusive).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn interval_coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    let hits: Vec<f64> = actual
        .iter()
        .zip(lower)
        .zip(upper)
        .map(|((&y, &lo), &hi)| if y >= lo && y <= hi { 1.0 } else { 0.0 })
        .collect();
    mean(&hits)
}

/// Mean interval width.
#[must_use]
pub fn interval_width(lower: &[f64], upper: &[f64]) -> f64 {
    let widths: Vec<f64> = lower.iter().zip(upper).map(|(lo, hi)| hi - lo).collect();
    mean(&widths)
}

/// Mean Winkler score of `(1 - alpha)` intervals (lower is better).
#[must_use]
pub fn winkler_score(actual: &[f64], lower: &[f64], upper: &[f64], alpha: f64) -> f64 {
    let penalty = 2.0 / alpha;
    let scores: Vec<f64> = actual
        .iter()
        .zip(lower)
        .zip(upper)
        .map(|((&y, &lo), &hi)| {
            let width = hi - lo;
            if y < lo {
                width + penalty * (lo - y)
            } else if y > hi {
                width + penalty * (y - hi)
            } else {
                width
            }
        })
        .collect();
    mean(&scores)
}

/// Probability integral transform values: the fraction of draws `<= actual`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn pit_values(actual: &[f64], samples: &PredictiveSamples) -> Vec<f64> {
    actual
        .iter()
        .zip(samples.iter())
        .map(|(&y, draws)| {
            if draws.is_empty() {
                f64::NAN
            } else {
                draws.iter().filter(|&&x| x <= y).count() as f64 / draws.len() as f64
            }
        })
        .collect()
}

/// PIT histogram calibration diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationScore {
    /// Mean squared deviation of the bin frequencies from uniform.
    pub error: f64,
    /// Expected frequency per bin under perfect calibration (`1 / n_bins`).
    pub expected_freq: f64,
    /// Observed frequency per bin.
    pub observed_freq: Vec<f64>,
}

/// Scores calibration by binning PIT values into `n_bins` equal-width bins
/// over `[0, 1]` (last bin closed) and comparing with a uniform histogram.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn calibration_score(
    actual: &[f64],
    samples: &PredictiveSamples,
    n_bins: usize,
) -> CalibrationScore {
    let n_bins = n_bins.max(1);
    let pit = pit_values(actual, samples);
    let n_obs = pit.len();

    let mut counts = vec![0_usize; n_bins];
    for value in pit.iter().filter(|v| (0.0..=1.0).contains(*v)) {
        let bin = ((value * n_bins as f64) as usize).min(n_bins - 1);
        counts[bin] += 1;
    }

    let observed_freq: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 / n_obs as f64)
        .collect();
    let expected_freq = 1.0 / n_bins as f64;
    let deviations: Vec<f64> = observed_freq
        .iter()
        .map(|f| (f - expected_freq).powi(2))
        .collect();

    CalibrationScore {
        error: mean(&deviations),
        expected_freq,
        observed_freq,
    }
}
