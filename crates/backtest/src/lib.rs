//! Walk-forward validation, forecast metrics and single-asset backtesting.

pub mod engine;
pub mod folds;
pub mod metrics;
pub mod report;
pub mod split;
pub mod walk_forward;

pub use engine::{BacktestResult, BacktestStep, BacktestSummary, Backtester, TRADE_THRESHOLD};
pub use folds::{
    create_folds, expanding_window_split, plan_folds, rolling_window_split, Fold, TestSize,
};
pub use metrics::{
    backtest_summary, forecast_summary, ForecastInputs, MetricRegistry, PredictiveSamples,
};
pub use report::{MetricRow, MetricTable, ReportFormatter};
pub use split::{Splits, TimeSeriesSplit};
pub use walk_forward::{
    FoldResult, MetricSummary, ValidationSummary, WalkForwardValidator, FOLD_COLUMN,
};
