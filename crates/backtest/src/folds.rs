//! Time-series fold generation.
//!
//! Folds are half-open `[start, end)` index ranges over a sequence. Every
//! fold's test window follows its training window (after an optional gap), so
//! no training slice ever contains an observation from its own test period.
//!
//! Step sizes use floor division. Leftover observations accumulate at the end
//! of the sequence rather than being spread across folds.

use std::ops::Range;

use forecast_eval_core::{EvalError, TimeSeriesFrame, WindowMethod};
use serde::{Deserialize, Serialize};

/// A single train/test partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// 0-based fold number in chronological order.
    pub fold_id: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

impl Fold {
    #[must_use]
    pub fn train_range(&self) -> Range<usize> {
        self.train_start..self.train_end
    }

    #[must_use]
    pub fn test_range(&self) -> Range<usize> {
        self.test_start..self.test_end
    }

    #[must_use]
    pub fn train_len(&self) -> usize {
        self.train_end - self.train_start
    }

    #[must_use]
    pub fn test_len(&self) -> usize {
        self.test_end - self.test_start
    }

    /// Returns true if train precedes test and both ranges are non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.train_start < self.train_end
            && self.train_end <= self.test_start
            && self.test_start < self.test_end
    }
}

/// Expanding-window folds: training always starts at 0 and grows.
///
/// `min_train_size` defaults to `n_samples / (n_folds + 1)`.
///
/// # Errors
///
/// Returns `InvalidConfig` if the minimum training size plus all test windows
/// and gaps do not fit in `n_samples`, or if any size is zero.
pub fn expanding_window_split(
    n_samples: usize,
    n_folds: usize,
    test_size: usize,
    min_train_size: Option<usize>,
    gap: usize,
) -> Result<Vec<Fold>, EvalError> {
    check_counts(n_folds, test_size)?;

    let min_train = min_train_size.unwrap_or(n_samples / (n_folds + 1));
    if min_train == 0 {
        return Err(EvalError::config(format!(
            "Minimum training size is zero for {n_samples} samples and {n_folds} folds"
        )));
    }

    let total_test = n_folds * test_size;
    let total_gap = n_folds * gap;
    let required = min_train + total_test + total_gap;
    if required > n_samples {
        return Err(EvalError::config(format!(
            "Not enough samples for fold configuration: need {required}, have {n_samples}"
        )));
    }

    let remaining = n_samples - required;
    let step = if n_folds > 1 { remaining / n_folds } else { 0 };

    let folds = (0..n_folds)
        .map(|i| {
            let train_end = min_train + step * (i + 1);
            let test_start = train_end + gap;
            Fold {
                fold_id: i,
                train_start: 0,
                train_end,
                test_start,
                test_end: test_start + test_size,
            }
        })
        .collect();

    Ok(folds)
}

/// Rolling-window folds: a fixed-size training window slides forward.
///
/// The step is `(n_samples - train_size - test_size - gap) / (n_folds - 1)`,
/// floored, so once the first fold fits every later fold ends at or before
/// `n_samples` and exactly `n_folds` folds are returned. Leftover samples
/// stay at the end of the series.
///
/// # Errors
///
/// Returns `InvalidConfig` if any size is zero or the first fold does not fit.
pub fn rolling_window_split(
    n_samples: usize,
    n_folds: usize,
    train_size: usize,
    test_size: usize,
    gap: usize,
) -> Result<Vec<Fold>, EvalError> {
    check_counts(n_folds, test_size)?;
    if train_size == 0 {
        return Err(EvalError::config("train_size must be at least 1"));
    }

    let window = train_size + gap + test_size;
    if window > n_samples {
        return Err(EvalError::config(format!(
            "No rolling fold fits: train {train_size} + gap {gap} + test {test_size} exceeds {n_samples} samples"
        )));
    }

    let span = n_samples - window;
    let step = if n_folds > 1 { span / (n_folds - 1) } else { 0 };

    Ok((0..n_folds)
        .map(|i| {
            let train_start = step * i;
            let train_end = train_start + train_size;
            let test_start = train_end + gap;
            Fold {
                fold_id: i,
                train_start,
                train_end,
                test_start,
                test_end: test_start + test_size,
            }
        })
        .collect())
}

fn check_counts(n_folds: usize, test_size: usize) -> Result<(), EvalError> {
    if n_folds == 0 {
        return Err(EvalError::config("n_folds must be at least 1"));
    }
    if test_size == 0 {
        return Err(EvalError::config("test_size must be at least 1"));
    }
    Ok(())
}

/// Size of each test window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TestSize {
    /// Observations per fold.
    Count(usize),
    /// Fraction of the whole series shared across all folds.
    Fraction(f64),
}

impl TestSize {
    /// Resolves to an observation count per fold.
    ///
    /// A fraction below one becomes `floor(n_samples * f / n_folds)`; a
    /// fraction of one or more is truncated to a count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a non-positive or non-finite fraction.
    pub fn resolve(self, n_samples: usize, n_folds: usize) -> Result<usize, EvalError> {
        match self {
            Self::Count(c) => Ok(c),
            Self::Fraction(f) if !(f.is_finite() && f > 0.0) => Err(EvalError::config(format!(
                "test size fraction must be positive, got {f}"
            ))),
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Fraction(f) if f < 1.0 => {
                Ok((n_samples as f64 * f / n_folds.max(1) as f64) as usize)
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Fraction(f) => Ok(f as usize),
        }
    }
}

impl From<usize> for TestSize {
    fn from(count: usize) -> Self {
        Self::Count(count)
    }
}

/// Plans folds for a series of `n_samples` observations.
///
/// Rolling mode uses `train_size`, defaulting to half the series.
///
/// # Errors
///
/// Returns `InvalidConfig` if the configuration cannot produce a partition.
pub fn plan_folds(
    n_samples: usize,
    method: WindowMethod,
    n_folds: usize,
    test_size: TestSize,
    train_size: Option<usize>,
    gap: usize,
) -> Result<Vec<Fold>, EvalError> {
    let test_samples = test_size.resolve(n_samples, n_folds)?;
    match method {
        WindowMethod::Expanding => {
            expanding_window_split(n_samples, n_folds, test_samples, None, gap)
        }
        WindowMethod::Rolling => rolling_window_split(
            n_samples,
            n_folds,
            train_size.unwrap_or(n_samples / 2),
            test_samples,
            gap,
        ),
    }
}

/// Splits a frame into `(train, test)` frame pairs.
///
/// # Errors
///
/// Returns `InvalidConfig` if the configuration cannot produce a partition.
pub fn create_folds(
    data: &TimeSeriesFrame,
    method: WindowMethod,
    n_folds: usize,
    test_size: TestSize,
    train_size: Option<usize>,
    gap: usize,
) -> Result<Vec<(TimeSeriesFrame, TimeSeriesFrame)>, EvalError> {
    let folds = plan_folds(data.len(), method, n_folds, test_size, train_size, gap)?;
    Ok(folds
        .iter()
        .map(|f| (data.slice(f.train_range()), data.slice(f.test_range())))
        .collect())
}
