//! Forecast and trading performance metrics.

pub mod point;
pub mod probabilistic;
pub mod registry;
pub mod stats;
pub mod summary;
pub mod trading;

pub use point::{mae, mape, mase, rmse, smape, MAPE_EPSILON};
pub use probabilistic::{
    calibration_score, crps, crps_from_draws, crps_gaussian, interval_coverage, interval_width,
    log_likelihood, pit_values, winkler_score, CalibrationScore, PredictiveSamples,
};
pub use registry::MetricRegistry;
pub use summary::{backtest_summary, forecast_summary, ForecastInputs};
pub use trading::{
    calmar_ratio, conditional_value_at_risk, drawdown_series, max_drawdown, profit_factor,
    risk_adjusted_return, sharpe_ratio, sortino_ratio, value_at_risk, win_rate, Drawdown,
    RiskAdjustedReturn,
};
