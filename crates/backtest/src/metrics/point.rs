//! Point-forecast error metrics.
//!
//! Inputs are aligned slices of equal length; the functions pair values
//! positionally. An empty input yields `NaN`.

use tracing::warn;

use super::stats::mean;

/// Default guard added to `|actual|` in MAPE.
pub const MAPE_EPSILON: f64 = 1e-10;
/// MASE scales below this are treated as zero.
pub const MIN_MASE_SCALE: f64 = 1e-10;

/// Mean absolute error.
#[must_use]
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .collect();
    mean(&errors)
}

/// Root mean squared error.
#[must_use]
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let squared: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .collect();
    mean(&squared).sqrt()
}

/// Mean absolute percentage error, in percent.
///
/// `epsilon` is added to `|actual|` so zero actuals do not divide by zero;
/// such observations instead contribute a very large error.
#[must_use]
pub fn mape(actual: &[f64], predicted: &[f64], epsilon: f64) -> f64 {
    let ratios: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / (a.abs() + epsilon)).abs())
        .collect();
    mean(&ratios) * 100.0
}

/// Symmetric mean absolute percentage error, in percent.
///
/// An observation where both actual and prediction are zero is `NaN`.
#[must_use]
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    let ratios: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (p - a).abs() / ((a.abs() + p.abs()) / 2.0))
        .collect();
    mean(&ratios) * 100.0
}

/// Mean absolute scaled error.
///
/// The scale is the mean absolute error of a seasonal naive forecast
/// (`y[t] = y[t - seasonality]`) over the training data. Values below 1 beat
/// the naive forecast. Returns `+inf` when the training scale is effectively
/// zero, and `NaN` when `seasonality` is zero or the training data is too
/// short to form a naive error.
#[must_use]
pub fn mase(actual: &[f64], predicted: &[f64], training_actual: &[f64], seasonality: usize) -> f64 {
    if seasonality == 0 || training_actual.len() <= seasonality {
        return f64::NAN;
    }

    let naive_errors: Vec<f64> = training_actual
        .iter()
        .skip(seasonality)
        .zip(training_actual)
        .map(|(later, earlier)| (later - earlier).abs())
        .collect();
    let scale = mean(&naive_errors);

    if scale < MIN_MASE_SCALE {
        warn!(scale, "Training data has near-zero variance; MASE may be unreliable");
        return f64::INFINITY;
    }

    mae(actual, predicted) / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // MAE / RMSE Tests
    // ============================================================

    #[test]
    fn mae_averages_absolute_errors() {
        let value = mae(&[1.0, 2.0, 3.0], &[1.1, 2.2, 2.9]);
        assert!((value - 0.133_333_333_333).abs() < 1e-9);
    }

    #[test]
    fn rmse_penalises_large_errors() {
        let value = rmse(&[0.0, 0.0, 0.0, 0.0], &[1.0, 1.0, 1.0, 3.0]);
        assert!((value - 3.0_f64.sqrt()).abs() < 1e-12);
        assert!(value > mae(&[0.0, 0.0, 0.0, 0.0], &[1.0, 1.0, 1.0, 3.0]));
    }

    #[test]
    fn perfect_forecast_has_zero_error() {
        let y = [5.0, -2.0, 3.5];
        assert_eq!(mae(&y, &y), 0.0);
        assert_eq!(rmse(&y, &y), 0.0);
        assert_eq!(mape(&y, &y, MAPE_EPSILON), 0.0);
        assert_eq!(smape(&y, &y), 0.0);
    }

    #[test]
    fn empty_inputs_are_nan() {
        assert!(mae(&[], &[]).is_nan());
        assert!(rmse(&[], &[]).is_nan());
    }

    // ============================================================
    // Percentage Error Tests
    // ============================================================

    #[test]
    fn mape_is_reported_in_percent() {
        let value = mape(&[100.0, 200.0], &[110.0, 180.0], MAPE_EPSILON);
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn mape_zero_actual_stays_finite() {
        let value = mape(&[0.0], &[1.0], MAPE_EPSILON);
        assert!(value.is_finite());
        assert!(value > 1e10);
    }

    #[test]
    fn smape_is_symmetric() {
        let forward = smape(&[100.0], &[120.0]);
        let backward = smape(&[120.0], &[100.0]);
        assert!((forward - backward).abs() < 1e-12);
        assert!((forward - 20.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    // ============================================================
    // MASE Tests
    // ============================================================

    #[test]
    fn mase_scales_by_naive_training_error() {
        // naive errors on [1, 3, 5, 7] are all 2
        let value = mase(&[10.0, 12.0], &[11.0, 11.0], &[1.0, 3.0, 5.0, 7.0], 1);
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn mase_seasonal_lag_uses_season_back() {
        // season 2: |5-1|, |7-3| = 4
        let value = mase(&[0.0], &[4.0], &[1.0, 3.0, 5.0, 7.0], 2);
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mase_constant_training_is_infinite() {
        let value = mase(&[1.0], &[2.0], &[3.0, 3.0, 3.0], 1);
        assert!(value.is_infinite() && value > 0.0);
    }

    #[test]
    fn mase_short_training_is_nan() {
        assert!(mase(&[1.0], &[2.0], &[3.0], 1).is_nan());
        assert!(mase(&[1.0], &[2.0], &[3.0, 4.0], 0).is_nan());
    }
}
