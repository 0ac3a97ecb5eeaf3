//! Baseline forecasters and forecast-to-signal rules.

pub mod forecasters;
pub mod signals;

pub use forecasters::{
    DriftForecaster, GaussianForecast, NaiveForecaster, RollingMeanForecaster,
    SeasonalNaiveForecaster,
};
pub use signals::{one_step_forecasts, SignalPoint, SignalSeries, ThresholdSignal};
