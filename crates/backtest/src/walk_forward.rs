//! Walk-forward validation: fit on the past, score on the following window.
//!
//! Folds come from [`plan_folds`] and are evaluated in chronological order.
//! Fit and predict failures abort the run unchanged; a metric that fails is
//! recorded as `NaN` for that fold and the run continues.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::Result;
use forecast_eval_core::{
    EvalError, Forecaster, IndexLabel, Predictions, TimeSeriesFrame, ValidationConfig,
    ACTUAL_COLUMN, PREDICTION_COLUMN,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::folds::{plan_folds, Fold, TestSize};
use crate::metrics::stats::{drop_nan, mean, median, std_dev};
use crate::metrics::MetricRegistry;

/// Column added by [`WalkForwardValidator::all_predictions`].
pub const FOLD_COLUMN: &str = "fold";

/// Outcome of one fold's fit, predict and score cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FoldResult {
    pub fold_id: usize,
    pub fold: Fold,
    pub train_start: IndexLabel,
    pub train_end: IndexLabel,
    pub test_start: IndexLabel,
    pub test_end: IndexLabel,
    pub n_train: usize,
    pub n_test: usize,
    /// Per-observation predictions aligned to the test index, with an
    /// `actual` column.
    pub predictions: TimeSeriesFrame,
    /// Metric values in registry order. Failed metrics are `NaN`.
    pub metrics: Vec<(String, f64)>,
    pub model_name: String,
    pub model_info: Option<BTreeMap<String, String>>,
}

impl FoldResult {
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Cross-fold statistics for one metric. `NaN` fold values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Folds with a non-NaN value.
    pub count: usize,
}

impl MetricSummary {
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let valid = drop_nan(values);
        if valid.is_empty() {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                count: 0,
            };
        }

        Self {
            mean: mean(&valid),
            std: std_dev(&valid, 1),
            min: valid.iter().copied().fold(f64::INFINITY, f64::min),
            max: valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            median: median(&valid),
            count: valid.len(),
        }
    }
}

/// Per-metric summary across all folds of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub n_folds: usize,
    /// Metrics in first-seen order.
    pub metrics: Vec<(String, MetricSummary)>,
}

impl ValidationSummary {
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&MetricSummary> {
        self.metrics
            .iter()
            .find(|(n, _)| n == metric)
            .map(|(_, s)| s)
    }
}

/// Runs walk-forward validation and keeps the last run's fold results.
#[derive(Debug, Clone, Default)]
pub struct WalkForwardValidator {
    config: ValidationConfig,
    test_size: Option<TestSize>,
    results: Vec<FoldResult>,
}

impl WalkForwardValidator {
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            test_size: None,
            results: Vec::new(),
        }
    }

    /// Overrides the configured test size, e.g. with a fraction of the series.
    #[must_use]
    pub fn with_test_size(mut self, test_size: TestSize) -> Self {
        self.test_size = Some(test_size);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Results of the most recent successful run.
    #[must_use]
    pub fn results(&self) -> &[FoldResult] {
        &self.results
    }

    /// Fits, predicts and scores every fold of `data`.
    ///
    /// `metrics` defaults to MAE and RMSE. With `refit` disabled the model
    /// fitted on the first fold is reused for all later folds. Results replace
    /// those of any previous run only when the whole run succeeds.
    ///
    /// # Errors
    ///
    /// Returns configuration and shape errors as [`EvalError`], and any
    /// error from `forecaster.fit` or `forecaster.predict` unchanged.
    pub fn validate<F: Forecaster>(
        &mut self,
        data: &TimeSeriesFrame,
        forecaster: &F,
        target_col: &str,
        metrics: Option<&MetricRegistry>,
        fit_options: &F::Options,
    ) -> Result<&[FoldResult]> {
        self.config.validate()?;
        let target = data.require_column(target_col)?;

        let default_registry;
        let registry = match metrics {
            Some(registry) => registry,
            None => {
                default_registry = MetricRegistry::default();
                &default_registry
            }
        };

        let folds = plan_folds(
            data.len(),
            self.config.method,
            self.config.n_folds,
            self.test_size.unwrap_or(TestSize::Count(self.config.test_size)),
            self.config.train_size,
            self.config.gap,
        )?;

        info!(
            "Starting walk-forward validation: {} folds ({}), model {}",
            folds.len(),
            self.config.method,
            forecaster.name()
        );

        let mut results = Vec::with_capacity(folds.len());
        let mut reusable: Option<F::Model> = None;

        for fold in &folds {
            let train = data.slice(fold.train_range());
            let test = data.slice(fold.test_range());
            let (Some(train_start), Some(train_end), Some(test_start), Some(test_end)) = (
                train.first_label(),
                train.last_label(),
                test.first_label(),
                test.last_label(),
            ) else {
                return Err(EvalError::config(format!("fold {} is empty", fold.fold_id)).into());
            };

            info!(
                "Fold {}/{}: train {} to {} ({} samples), test {} to {} ({} samples)",
                fold.fold_id + 1,
                folds.len(),
                train_start,
                train_end,
                train.len(),
                test_start,
                test_end,
                test.len()
            );

            let model = match reusable.take() {
                Some(model) if !self.config.refit => model,
                _ => forecaster.fit(&train, fit_options)?,
            };
            let raw = forecaster.predict(&model, &test)?;

            let mut predictions = align_predictions(raw, &test)?;
            if !predictions.has_column(ACTUAL_COLUMN) {
                predictions.insert_column(ACTUAL_COLUMN, target[fold.test_range()].to_vec())?;
            }

            let fold_metrics = score_fold(registry, &predictions, fold.fold_id)?;
            for (name, value) in &fold_metrics {
                debug!("Fold {} {}: {:.4}", fold.fold_id + 1, name, value);
            }

            results.push(FoldResult {
                fold_id: fold.fold_id,
                fold: *fold,
                train_start,
                train_end,
                test_start,
                test_end,
                n_train: train.len(),
                n_test: test.len(),
                predictions,
                metrics: fold_metrics,
                model_name: forecaster.name().to_string(),
                model_info: forecaster.describe(&model),
            });
            reusable = Some(model);
        }

        info!("Walk-forward validation complete: {} folds", results.len());
        self.results = results;
        Ok(&self.results)
    }

    /// Mean, standard deviation, min, max and median of every metric.
    ///
    /// # Errors
    ///
    /// Returns `NotRun` before a successful `validate`.
    pub fn summary(&self) -> Result<ValidationSummary, EvalError> {
        if self.results.is_empty() {
            return Err(EvalError::NotRun("validate()"));
        }

        let mut order: Vec<&str> = Vec::new();
        let mut values: HashMap<&str, Vec<f64>> = HashMap::new();
        for result in &self.results {
            for (name, value) in &result.metrics {
                if !values.contains_key(name.as_str()) {
                    order.push(name);
                }
                values.entry(name).or_default().push(*value);
            }
        }

        let metrics = order
            .into_iter()
            .map(|name| {
                let stats =
                    MetricSummary::from_values(values.get(name).map(Vec::as_slice).unwrap_or_default());
                (name.to_string(), stats)
            })
            .collect();

        Ok(ValidationSummary {
            n_folds: self.results.len(),
            metrics,
        })
    }

    /// Every fold's prediction table stacked in fold order, tagged with a
    /// `fold` column.
    ///
    /// # Errors
    ///
    /// Returns `NotRun` before a successful `validate`.
    #[allow(clippy::cast_precision_loss)]
    pub fn all_predictions(&self) -> Result<TimeSeriesFrame, EvalError> {
        if self.results.is_empty() {
            return Err(EvalError::NotRun("validate()"));
        }

        let tagged = self
            .results
            .iter()
            .map(|result| {
                let mut frame = result.predictions.clone();
                frame.insert_column(FOLD_COLUMN, vec![result.fold_id as f64; frame.len()])?;
                Ok(frame)
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        Ok(TimeSeriesFrame::concat(&tagged))
    }
}

/// Puts a forecaster's output onto the test slice's index.
///
/// Point predictions and tables of the test length are matched by position.
/// Tables of any other length are matched by label, leaving `NaN` for test
/// rows the table does not cover. A table without a `prediction` column uses
/// its first column as the prediction.
fn align_predictions(raw: Predictions, test: &TimeSeriesFrame) -> Result<TimeSeriesFrame, EvalError> {
    let mut aligned = TimeSeriesFrame::new(test.index().to_vec());

    match raw {
        Predictions::Point(values) => {
            aligned.insert_column(PREDICTION_COLUMN, values)?;
        }
        Predictions::Table(table) => {
            let rows: Vec<Option<usize>> = if table.len() == test.len() {
                (0..test.len()).map(Some).collect()
            } else {
                let by_label: HashMap<&IndexLabel, usize> =
                    table.index().iter().enumerate().map(|(i, l)| (l, i)).collect();
                test.index().iter().map(|l| by_label.get(l).copied()).collect()
            };

            for name in table.column_names() {
                let source = table.require_column(name)?;
                let values = rows
                    .iter()
                    .map(|row| row.map_or(f64::NAN, |i| source[i]))
                    .collect();
                aligned.insert_column(name, values)?;
            }

            if !aligned.has_column(PREDICTION_COLUMN) {
                let first = aligned
                    .column_names()
                    .next()
                    .map(str::to_string)
                    .ok_or_else(|| EvalError::MissingColumn(PREDICTION_COLUMN.to_string()))?;
                let values = aligned.require_column(&first)?.to_vec();
                aligned.insert_column(PREDICTION_COLUMN, values)?;
            }
        }
    }

    Ok(aligned)
}

/// Evaluates every registered metric on one fold, isolating failures.
fn score_fold(
    registry: &MetricRegistry,
    predictions: &TimeSeriesFrame,
    fold_id: usize,
) -> Result<Vec<(String, f64)>, EvalError> {
    let actual = predictions.require_column(ACTUAL_COLUMN)?;
    let predicted = predictions.require_column(PREDICTION_COLUMN)?;

    Ok(registry
        .iter()
        .map(|(name, metric)| {
            let value = match catch_unwind(AssertUnwindSafe(|| metric(actual, predicted))) {
                Ok(Ok(value)) => value,
                Ok(Err(e)) => {
                    warn!("Failed to calculate {} on fold {}: {}", name, fold_id + 1, e);
                    f64::NAN
                }
                Err(_) => {
                    warn!("Metric {} panicked on fold {}", name, fold_id + 1);
                    f64::NAN
                }
            };
            (name.to_string(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use forecast_eval_core::{FnForecaster, WindowMethod};
    use std::cell::Cell;

    fn linear_frame(n: usize) -> TimeSeriesFrame {
        TimeSeriesFrame::with_positions(n)
            .with_column("y", (0..n).map(|i| i as f64).collect())
            .unwrap()
    }

    fn config(n_folds: usize, test_size: usize) -> ValidationConfig {
        ValidationConfig {
            n_folds,
            test_size,
            ..ValidationConfig::default()
        }
    }

    /// Predicts the last training value for every test row.
    fn last_value_forecaster() -> impl Forecaster<Model = (f64, IndexLabel), Options = ()> {
        FnForecaster::new(
            "last_value",
            |train: &TimeSeriesFrame, _: &()| {
                let y = train.require_column("y")?;
                let last = *y.last().ok_or_else(|| anyhow!("empty train"))?;
                let label = train.last_label().ok_or_else(|| anyhow!("empty train"))?;
                Ok((last, label))
            },
            |model: &(f64, IndexLabel), test: &TimeSeriesFrame| {
                Ok(Predictions::Point(vec![model.0; test.len()]))
            },
        )
    }

    // ============================================================
    // Validation Run Tests
    // ============================================================

    #[test]
    fn validate_produces_one_result_per_fold() {
        let mut validator = WalkForwardValidator::new(config(3, 10));
        let results = validator
            .validate(&linear_frame(100), &last_value_forecaster(), "y", None, &())
            .unwrap();

        assert_eq!(results.len(), 3);
        let train_ends: Vec<usize> = results.iter().map(|r| r.fold.train_end).collect();
        assert_eq!(train_ends, vec![40, 55, 70]);

        let first = &results[0];
        assert_eq!(first.metrics.len(), 2);
        assert_eq!(first.metrics[0].0, "MAE");
        assert_eq!(first.test_start, IndexLabel::Position(40));
        assert_eq!(first.test_end, IndexLabel::Position(49));
        assert_eq!((first.n_train, first.n_test), (40, 10));
        assert_eq!(first.model_name, "last_value");
        // last train value 39; actuals 40..=49 -> mean error 5.5
        assert!((first.metric("MAE").unwrap() - 5.5).abs() < 1e-12);
    }

    #[test]
    fn validate_injects_actual_column_from_target() {
        let mut validator = WalkForwardValidator::new(config(2, 5));
        let results = validator
            .validate(&linear_frame(30), &last_value_forecaster(), "y", None, &())
            .unwrap();

        let fold = &results[1];
        let actual = fold.predictions.require_column(ACTUAL_COLUMN).unwrap();
        assert_eq!(actual[0], fold.fold.test_start as f64);
        assert_eq!(fold.predictions.index()[0], fold.test_start);
    }

    #[test]
    fn validate_never_trains_on_test_rows() {
        let forecaster = FnForecaster::new(
            "leak_check",
            |train: &TimeSeriesFrame, _: &()| train.last_label().ok_or_else(|| anyhow!("empty")),
            |last_train: &IndexLabel, test: &TimeSeriesFrame| {
                let first_test = test.first_label().ok_or_else(|| anyhow!("empty"))?;
                assert!(*last_train < first_test, "training saw the test window");
                Ok(Predictions::Point(vec![0.0; test.len()]))
            },
        );
        let mut validator = WalkForwardValidator::new(ValidationConfig {
            gap: 3,
            method: WindowMethod::Rolling,
            train_size: Some(20),
            ..config(4, 5)
        });
        let results = validator
            .validate(&linear_frame(80), &forecaster, "y", None, &())
            .unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn validate_without_refit_fits_once() {
        let fits = Cell::new(0);
        let forecaster = FnForecaster::new(
            "counting",
            |_: &TimeSeriesFrame, _: &()| {
                fits.set(fits.get() + 1);
                Ok(0.0)
            },
            |m: &f64, test: &TimeSeriesFrame| Ok(Predictions::Point(vec![*m; test.len()])),
        );

        let mut validator = WalkForwardValidator::new(ValidationConfig {
            refit: false,
            ..config(4, 5)
        });
        validator
            .validate(&linear_frame(60), &forecaster, "y", None, &())
            .unwrap();
        assert_eq!(fits.get(), 1);

        let mut refitting = WalkForwardValidator::new(config(4, 5));
        refitting
            .validate(&linear_frame(60), &forecaster, "y", None, &())
            .unwrap();
        assert_eq!(fits.get(), 5);
    }

    #[test]
    fn validate_propagates_fit_failure_unchanged() {
        let forecaster = FnForecaster::new(
            "broken",
            |_: &TimeSeriesFrame, _: &()| -> Result<f64> { Err(anyhow!("singular matrix")) },
            |_: &f64, test: &TimeSeriesFrame| Ok(Predictions::Point(vec![0.0; test.len()])),
        );
        let mut validator = WalkForwardValidator::new(config(2, 5));
        let err = validator
            .validate(&linear_frame(30), &forecaster, "y", None, &())
            .unwrap_err();
        assert_eq!(err.to_string(), "singular matrix");
        assert!(validator.results().is_empty());
    }

    #[test]
    fn validate_rejects_missing_target_column() {
        let mut validator = WalkForwardValidator::new(config(2, 5));
        let err = validator
            .validate(&linear_frame(30), &last_value_forecaster(), "close", None, &())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EvalError>(),
            Some(&EvalError::MissingColumn("close".to_string()))
        );
    }

    #[test]
    fn validate_records_failing_metric_as_nan() {
        let registry = MetricRegistry::default()
            .register_fallible("Broken", |_, _| Err(EvalError::Metric("no variance".into())))
            .register("Panics", |actual: &[f64], _: &[f64]| actual[actual.len() + 1]);

        let mut validator = WalkForwardValidator::new(config(3, 5));
        let results = validator
            .validate(
                &linear_frame(40),
                &last_value_forecaster(),
                "y",
                Some(&registry),
                &(),
            )
            .unwrap();

        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.metric("MAE").unwrap().is_finite());
            assert!(result.metric("Broken").unwrap().is_nan());
            assert!(result.metric("Panics").unwrap().is_nan());
        }
    }

    #[test]
    fn validate_aligns_table_predictions_to_test_index() {
        let forecaster = FnForecaster::new(
            "table",
            |_: &TimeSeriesFrame, _: &()| Ok(()),
            |_: &(), test: &TimeSeriesFrame| {
                let table = TimeSeriesFrame::with_positions(test.len())
                    .with_column("mean", vec![1.0; test.len()])?
                    .with_column("std", vec![0.5; test.len()])?;
                Ok(Predictions::Table(table))
            },
        );

        let mut validator = WalkForwardValidator::new(config(2, 4));
        let results = validator
            .validate(&linear_frame(30), &forecaster, "y", None, &())
            .unwrap();

        let predictions = &results[1].predictions;
        assert_eq!(predictions.index()[0], results[1].test_start);
        assert_eq!(predictions.column(PREDICTION_COLUMN).unwrap(), &[1.0; 4]);
        assert_eq!(predictions.column("std").unwrap(), &[0.5; 4]);
    }

    #[test]
    fn validate_rejects_point_predictions_of_wrong_length() {
        let forecaster = FnForecaster::new(
            "short",
            |_: &TimeSeriesFrame, _: &()| Ok(()),
            |_: &(), _: &TimeSeriesFrame| Ok(Predictions::Point(vec![1.0])),
        );
        let mut validator = WalkForwardValidator::new(config(2, 4));
        assert!(validator
            .validate(&linear_frame(30), &forecaster, "y", None, &())
            .is_err());
    }

    // ============================================================
    // Summary Tests
    // ============================================================

    #[test]
    fn summary_before_validate_is_not_run_error() {
        let validator = WalkForwardValidator::new(ValidationConfig::default());
        assert_eq!(validator.summary(), Err(EvalError::NotRun("validate()")));
        assert_eq!(
            validator.all_predictions(),
            Err(EvalError::NotRun("validate()"))
        );
    }

    #[test]
    fn metric_summary_ignores_nan_and_uses_sample_std() {
        let stats = MetricSummary::from_values(&[1.0, f64::NAN, 2.0, 3.0]);
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.std - 1.0).abs() < 1e-12);
        assert_eq!((stats.min, stats.max, stats.median), (1.0, 3.0, 2.0));
    }

    #[test]
    fn metric_summary_all_nan_is_nan() {
        let stats = MetricSummary::from_values(&[f64::NAN, f64::NAN]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan() && stats.std.is_nan() && stats.median.is_nan());
    }

    #[test]
    fn summary_reports_every_metric_in_order() {
        let mut validator = WalkForwardValidator::new(config(3, 10));
        validator
            .validate(&linear_frame(100), &last_value_forecaster(), "y", None, &())
            .unwrap();

        let summary = validator.summary().unwrap();
        assert_eq!(summary.n_folds, 3);
        let names: Vec<&str> = summary.metrics.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["MAE", "RMSE"]);
        // every fold predicts the last train value for a unit-slope series
        let mae = summary.get("MAE").unwrap();
        assert!((mae.mean - 5.5).abs() < 1e-12);
        assert!(mae.std.abs() < 1e-12);
    }

    #[test]
    fn all_predictions_stacks_folds_with_fold_column() {
        let mut validator = WalkForwardValidator::new(config(3, 10));
        validator
            .validate(&linear_frame(100), &last_value_forecaster(), "y", None, &())
            .unwrap();

        let all = validator.all_predictions().unwrap();
        assert_eq!(all.len(), 30);
        let folds = all.column(FOLD_COLUMN).unwrap();
        assert_eq!(folds[0], 0.0);
        assert_eq!(folds[29], 2.0);
        assert!(all.has_column(ACTUAL_COLUMN));
    }
}
