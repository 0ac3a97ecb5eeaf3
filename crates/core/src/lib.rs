pub mod config;
pub mod config_loader;
pub mod error;
pub mod frame;
pub mod kelly;
pub mod position_sizing;
pub mod traits;

pub use config::{AppConfig, BacktestConfig, MetricsConfig, ValidationConfig, WindowMethod};
pub use config_loader::ConfigLoader;
pub use error::EvalError;
pub use frame::{IndexLabel, TimeSeriesFrame};
pub use kelly::{ForecastKellySizer, KellyDecision, KellySizer, SizingReason};
pub use position_sizing::{
    signal_direction, ConfidenceSizer, ForecastConfidenceSizer, ScaledSignalSizer,
};
pub use traits::{
    FnForecaster, FnSizer, Forecaster, PositionSizer, Predictions, SizingContext,
    ACTUAL_COLUMN, PREDICTION_COLUMN,
};
