use std::collections::BTreeMap;
use std::marker::PhantomData;

use anyhow::Result;

use crate::frame::TimeSeriesFrame;

/// Column name for point predictions in a prediction table.
pub const PREDICTION_COLUMN: &str = "prediction";
/// Column name for realised values in a prediction table.
pub const ACTUAL_COLUMN: &str = "actual";

/// Output of `Forecaster::predict`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// A bare sequence of point predictions, one per test row.
    Point(Vec<f64>),
    /// A table that already contains a `prediction` column and optionally
    /// extra columns such as `std`, `lower` or `upper`.
    Table(TimeSeriesFrame),
}

/// A model family that can be fitted on a training slice and asked to
/// predict a test slice.
pub trait Forecaster {
    /// Opaque fitted-model handle.
    type Model;
    /// Caller-defined fit options.
    type Options;

    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Implementations return any fitting failure; it aborts the run.
    fn fit(&self, train: &TimeSeriesFrame, options: &Self::Options) -> Result<Self::Model>;

    /// # Errors
    ///
    /// Implementations return any prediction failure; it aborts the run.
    fn predict(&self, model: &Self::Model, test: &TimeSeriesFrame) -> Result<Predictions>;

    /// Free-form metadata recorded alongside each fold.
    fn describe(&self, _model: &Self::Model) -> Option<BTreeMap<String, String>> {
        None
    }
}

/// A `Forecaster` assembled from a pair of closures.
pub struct FnForecaster<Fit, Pred, M, O> {
    name: String,
    fit: Fit,
    predict: Pred,
    _marker: PhantomData<fn(&O) -> M>,
}

impl<Fit, Pred, M, O> FnForecaster<Fit, Pred, M, O>
where
    Fit: Fn(&TimeSeriesFrame, &O) -> Result<M>,
    Pred: Fn(&M, &TimeSeriesFrame) -> Result<Predictions>,
{
    pub fn new(name: &str, fit: Fit, predict: Pred) -> Self {
        Self {
            name: name.to_string(),
            fit,
            predict,
            _marker: PhantomData,
        }
    }
}

impl<Fit, Pred, M, O> Forecaster for FnForecaster<Fit, Pred, M, O>
where
    Fit: Fn(&TimeSeriesFrame, &O) -> Result<M>,
    Pred: Fn(&M, &TimeSeriesFrame) -> Result<Predictions>,
{
    type Model = M;
    type Options = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, train: &TimeSeriesFrame, options: &O) -> Result<M> {
        (self.fit)(train, options)
    }

    fn predict(&self, model: &M, test: &TimeSeriesFrame) -> Result<Predictions> {
        (self.predict)(model, test)
    }
}

/// Inputs available to a position sizer at one backtest step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingContext {
    /// Position of the bar whose signal is being acted on (the previous bar).
    pub period: usize,
    /// Signal observed at `period`.
    pub signal: f64,
    /// Price of the bar being traded.
    pub price: f64,
    /// Portfolio equity at the end of `period`.
    pub equity: f64,
}

/// Maps a signal to a target position expressed as a signed fraction of equity.
pub trait PositionSizer {
    fn target_position(&self, ctx: &SizingContext) -> f64;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Adapts a `(signal, price, equity) -> position` closure into a `PositionSizer`.
pub struct FnSizer<F>(pub F);

impl<F> PositionSizer for FnSizer<F>
where
    F: Fn(f64, f64, f64) -> f64,
{
    fn target_position(&self, ctx: &SizingContext) -> f64 {
        (self.0)(ctx.signal, ctx.price, ctx.equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_forecaster_delegates_to_closures() {
        let forecaster = FnForecaster::new(
            "last",
            |train: &TimeSeriesFrame, offset: &f64| {
                let last = train.require_column("y")?.last().copied().unwrap_or(0.0);
                Ok(last + offset)
            },
            |model: &f64, test: &TimeSeriesFrame| Ok(Predictions::Point(vec![*model; test.len()])),
        );

        let train = TimeSeriesFrame::with_positions(3)
            .with_column("y", vec![1.0, 2.0, 3.0])
            .unwrap();
        let model = forecaster.fit(&train, &0.5).unwrap();
        let preds = forecaster
            .predict(&model, &TimeSeriesFrame::with_positions(2))
            .unwrap();

        assert_eq!(forecaster.name(), "last");
        assert_eq!(preds, Predictions::Point(vec![3.5, 3.5]));
        assert!(forecaster.describe(&model).is_none());
    }

    #[test]
    fn fn_sizer_receives_signal_price_and_equity() {
        let sizer = FnSizer(|signal: f64, price: f64, equity: f64| signal * price / equity);
        let ctx = SizingContext {
            period: 0,
            signal: 2.0,
            price: 50.0,
            equity: 100.0,
        };
        assert!((sizer.target_position(&ctx) - 1.0).abs() < f64::EPSILON);
        assert_eq!(sizer.name(), "custom");
    }
}
