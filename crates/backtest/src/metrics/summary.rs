//! Composite report tables for forecasts and backtests.
//!
//! A metric appears in the table only when every input it needs was
//! supplied.

use forecast_eval_core::{EvalError, MetricsConfig};

use super::point::{mae, mape, mase, rmse, smape};
use super::probabilistic::{
    calibration_score, crps, interval_coverage, interval_width, winkler_score, PredictiveSamples,
};
use super::stats::{mean, population_std};
use super::trading::{
    annualize_total_return, calmar_ratio, cumulative_growth, max_drawdown, profit_factor,
    risk_adjusted_return, sharpe_ratio, sortino_ratio, win_rate, MIN_STD,
};
use crate::report::MetricTable;

/// Inputs to [`forecast_summary`]. Only `actual` and `predicted` are required.
#[derive(Debug, Clone, Copy)]
pub struct ForecastInputs<'a> {
    pub actual: &'a [f64],
    pub predicted: &'a [f64],
    pub samples: Option<&'a PredictiveSamples>,
    pub interval: Option<(&'a [f64], &'a [f64])>,
    pub training_actual: Option<&'a [f64]>,
    pub seasonality: usize,
}

impl<'a> ForecastInputs<'a> {
    #[must_use]
    pub fn new(actual: &'a [f64], predicted: &'a [f64]) -> Self {
        Self {
            actual,
            predicted,
            samples: None,
            interval: None,
            training_actual: None,
            seasonality: 1,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: &'a PredictiveSamples) -> Self {
        self.samples = Some(samples);
        self
    }

    #[must_use]
    pub fn with_interval(mut self, lower: &'a [f64], upper: &'a [f64]) -> Self {
        self.interval = Some((lower, upper));
        self
    }

    #[must_use]
    pub fn with_training(mut self, training_actual: &'a [f64], seasonality: usize) -> Self {
        self.training_actual = Some(training_actual);
        self.seasonality = seasonality;
        self
    }
}

/// Point, probabilistic and interval metrics for one forecast.
///
/// # Errors
///
/// Returns `LengthMismatch` if any supplied series is not aligned with
/// `actual`.
pub fn forecast_summary(
    inputs: &ForecastInputs<'_>,
    config: &MetricsConfig,
) -> Result<MetricTable, EvalError> {
    let actual = inputs.actual;
    let n = actual.len();
    EvalError::check_len(n, inputs.predicted.len())?;

    let mut table = MetricTable::new();
    table.push("MAE", mae(actual, inputs.predicted));
    table.push("RMSE", rmse(actual, inputs.predicted));
    table.push("MAPE", mape(actual, inputs.predicted, config.mape_epsilon));
    table.push("SMAPE", smape(actual, inputs.predicted));

    if let Some(training) = inputs.training_actual {
        table.push(
            "MASE",
            mase(actual, inputs.predicted, training, inputs.seasonality),
        );
    }

    if let Some(samples) = inputs.samples {
        EvalError::check_len(n, samples.n_observations())?;
        table.push("CRPS", crps(actual, samples));
        let calibration = calibration_score(actual, samples, config.calibration_bins);
        table.push("Calibration Error", calibration.error);
    }

    if let Some((lower, upper)) = inputs.interval {
        EvalError::check_len(n, lower.len())?;
        EvalError::check_len(n, upper.len())?;
        table.push("Coverage (%)", interval_coverage(actual, lower, upper) * 100.0);
        table.push("Interval Width", interval_width(lower, upper));
        table.push(
            "Winkler Score",
            winkler_score(actual, lower, upper, config.winkler_alpha),
        );
    }

    Ok(table)
}

/// Return, risk and trade statistics for a strategy's period returns,
/// optionally compared against a benchmark.
///
/// Annualization, the risk-free rate and the VaR level come from `config`;
/// the VaR rows are labelled with that level.
///
/// # Errors
///
/// Returns `Metric` for an empty return series and `LengthMismatch` when
/// the benchmark is shorter than the returns.
pub fn backtest_summary(
    returns: &[f64],
    benchmark: Option<&[f64]>,
    config: &MetricsConfig,
) -> Result<MetricTable, EvalError> {
    if returns.is_empty() {
        return Err(EvalError::Metric("backtest summary needs at least one return".into()));
    }
    let periods_per_year = config.periods_per_year;
    let rf = config.risk_free_rate;
    let ppy = f64::from(periods_per_year);

    let growth = cumulative_growth(returns);
    let total_return = growth.last().copied().unwrap_or(1.0) - 1.0;
    let annual_return = annualize_total_return(total_return, returns.len(), periods_per_year) * 100.0;
    let annual_volatility = population_std(returns) * ppy.sqrt() * 100.0;

    let mut table = MetricTable::new();
    table.push("Total Return (%)", total_return * 100.0);
    table.push("Annual Return (%)", annual_return);
    table.push("Annual Volatility (%)", annual_volatility);
    table.push("Max Drawdown (%)", max_drawdown(&growth).max_drawdown * 100.0);
    table.push("Sharpe Ratio", sharpe_ratio(returns, rf, periods_per_year));
    table.push("Sortino Ratio", sortino_ratio(returns, rf, periods_per_year));
    table.push("Calmar Ratio", calmar_ratio(returns, periods_per_year));
    table.push("Win Rate (%)", win_rate(returns) * 100.0);
    table.push("Profit Factor", profit_factor(returns));

    let risk = risk_adjusted_return(returns, config.var_confidence, periods_per_year);
    let level = confidence_label(config.var_confidence);
    table.push(format!("Daily VaR ({level})"), risk.var * 100.0);
    table.push(format!("Daily CVaR ({level})"), risk.cvar * 100.0);

    if let Some(benchmark) = benchmark {
        if benchmark.len() < returns.len() {
            return Err(EvalError::LengthMismatch {
                expected: returns.len(),
                actual: benchmark.len(),
            });
        }
        let benchmark_total = benchmark.iter().map(|r| 1.0 + r).product::<f64>() - 1.0;
        table.push("Benchmark Return (%)", benchmark_total * 100.0);
        table.push(
            "Alpha (%)",
            annual_return - sharpe_ratio(benchmark, rf, periods_per_year) * annual_volatility,
        );

        let excess: Vec<f64> = returns.iter().zip(benchmark).map(|(r, b)| r - b).collect();
        let tracking_error = population_std(&excess);
        if tracking_error > MIN_STD {
            table.push("Information Ratio", mean(&excess) / tracking_error * ppy.sqrt());
        }
    }

    Ok(table)
}

/// `0.95` -> `95%`, `0.975` -> `97.5%`.
fn confidence_label(confidence: f64) -> String {
    let pct = confidence * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{pct:.0}%")
    } else {
        format!("{pct:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Forecast Summary Tests
    // ============================================================

    #[test]
    fn forecast_summary_point_only_has_four_metrics() {
        let actual = [100.0, 102.0, 101.0];
        let predicted = [99.0, 103.0, 100.0];
        let table =
            forecast_summary(&ForecastInputs::new(&actual, &predicted), &MetricsConfig::default())
                .unwrap();

        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["MAE", "RMSE", "MAPE", "SMAPE"]
        );
        assert!((table.get("MAE").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn forecast_summary_adds_metrics_for_supplied_inputs() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.5, 2.5, 2.5, 3.5];
        let lower = [0.0, 1.0, 2.0, 5.0];
        let upper = [2.0, 3.0, 4.0, 6.0];
        let samples = PredictiveSamples::per_observation(vec![vec![1.0, 2.0]; 4]);
        let training = [0.0, 1.0, 2.0, 3.0];

        let inputs = ForecastInputs::new(&actual, &predicted)
            .with_samples(&samples)
            .with_interval(&lower, &upper)
            .with_training(&training, 1);
        let table = forecast_summary(&inputs, &MetricsConfig::default()).unwrap();

        for name in [
            "MASE",
            "CRPS",
            "Calibration Error",
            "Coverage (%)",
            "Interval Width",
            "Winkler Score",
        ] {
            assert!(table.contains(name), "missing {name}");
        }
        assert!((table.get("Coverage (%)").unwrap() - 75.0).abs() < 1e-9);
        assert!((table.get("MASE").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn forecast_summary_rejects_misaligned_interval() {
        let actual = [1.0, 2.0];
        let inputs = ForecastInputs::new(&actual, &actual).with_interval(&[0.0], &[3.0]);
        assert!(matches!(
            forecast_summary(&inputs, &MetricsConfig::default()),
            Err(EvalError::LengthMismatch { .. })
        ));
    }

    // ============================================================
    // Backtest Summary Tests
    // ============================================================

    #[test]
    fn backtest_summary_without_benchmark_has_core_rows() {
        let returns = [0.01, -0.02, 0.015, 0.0, 0.005];
        let table = backtest_summary(&returns, None, &MetricsConfig::default()).unwrap();

        assert_eq!(table.len(), 11);
        assert!(!table.contains("Alpha (%)"));
        let total = (1.01 * 0.98 * 1.015 * 1.0 * 1.005 - 1.0) * 100.0;
        assert!((table.get("Total Return (%)").unwrap() - total).abs() < 1e-9);
        assert!((table.get("Win Rate (%)").unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn backtest_summary_with_benchmark_adds_comparison() {
        let returns = [0.01, -0.02, 0.015, 0.0, 0.005];
        let benchmark = [0.0, 0.01, 0.0, -0.01, 0.02, 0.5];
        let table =
            backtest_summary(&returns, Some(&benchmark), &MetricsConfig::default()).unwrap();

        assert!(table.contains("Benchmark Return (%)"));
        assert!(table.contains("Alpha (%)"));
        assert!(table.contains("Information Ratio"));
    }

    #[test]
    fn backtest_summary_identical_benchmark_skips_information_ratio() {
        let returns = [0.01, -0.02, 0.015];
        let table =
            backtest_summary(&returns, Some(&returns), &MetricsConfig::default()).unwrap();
        assert!(!table.contains("Information Ratio"));
    }

    #[test]
    fn backtest_summary_rejects_empty_returns() {
        assert!(backtest_summary(&[], None, &MetricsConfig::default()).is_err());
    }

    #[allow(clippy::cast_precision_loss)]
    fn spread_returns() -> Vec<f64> {
        (0..20).map(|i| (i as f64 - 10.0) / 1000.0).collect()
    }

    #[test]
    fn backtest_summary_var_rows_follow_configured_confidence() {
        let returns = spread_returns();
        let default = backtest_summary(&returns, None, &MetricsConfig::default()).unwrap();
        let config = MetricsConfig {
            var_confidence: 0.8,
            ..MetricsConfig::default()
        };
        let loose = backtest_summary(&returns, None, &config).unwrap();

        assert!(default.contains("Daily VaR (95%)"));
        assert!(!loose.contains("Daily VaR (95%)"));
        let var_95 = default.get("Daily VaR (95%)").unwrap();
        let var_80 = loose.get("Daily VaR (80%)").unwrap();
        assert!(var_80 > var_95, "VaR 80% {var_80} should be above VaR 95% {var_95}");
        let cvar_95 = default.get("Daily CVaR (95%)").unwrap();
        let cvar_80 = loose.get("Daily CVaR (80%)").unwrap();
        assert!(cvar_80 > cvar_95);
    }

    #[test]
    fn backtest_summary_sharpe_uses_configured_risk_free_rate() {
        let returns = spread_returns();
        let base = backtest_summary(&returns, None, &MetricsConfig::default()).unwrap();
        let config = MetricsConfig {
            risk_free_rate: 0.05,
            ..MetricsConfig::default()
        };
        let with_rf = backtest_summary(&returns, None, &config).unwrap();

        assert!(with_rf.get("Sharpe Ratio").unwrap() < base.get("Sharpe Ratio").unwrap());
        assert!(with_rf.get("Sortino Ratio").unwrap() < base.get("Sortino Ratio").unwrap());
    }

    #[test]
    fn backtest_summary_annualizes_with_configured_periods() {
        let returns = spread_returns();
        let daily = backtest_summary(&returns, None, &MetricsConfig::default()).unwrap();
        let config = MetricsConfig {
            periods_per_year: 12,
            ..MetricsConfig::default()
        };
        let monthly = backtest_summary(&returns, None, &config).unwrap();

        let ratio = daily.get("Annual Volatility (%)").unwrap()
            / monthly.get("Annual Volatility (%)").unwrap();
        assert!((ratio - (252.0_f64 / 12.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn confidence_label_keeps_fractional_levels() {
        assert_eq!(confidence_label(0.95), "95%");
        assert_eq!(confidence_label(0.975), "97.5%");
    }
}
