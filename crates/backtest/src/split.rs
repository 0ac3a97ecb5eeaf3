//! Cross-validation iterator over time-series folds.
//!
//! `TimeSeriesSplit` wraps the fold generator with the conventional
//! `split(n) -> (train_indices, test_indices)` contract used by generic
//! model-selection code. Splitting is restartable: calling `split` again with
//! the same length yields the same sequence.

use forecast_eval_core::{EvalError, WindowMethod};
use serde::{Deserialize, Serialize};

use crate::folds::{expanding_window_split, rolling_window_split, Fold};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesSplit {
    n_splits: usize,
    test_size: usize,
    gap: usize,
    method: WindowMethod,
    train_size: Option<usize>,
}

impl Default for TimeSeriesSplit {
    fn default() -> Self {
        Self {
            n_splits: 5,
            test_size: 1,
            gap: 0,
            method: WindowMethod::Expanding,
            train_size: None,
        }
    }
}

impl TimeSeriesSplit {
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_test_size(mut self, test_size: usize) -> Self {
        self.test_size = test_size;
        self
    }

    #[must_use]
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: WindowMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the rolling-window training size (defaults to half the series).
    #[must_use]
    pub fn with_train_size(mut self, train_size: usize) -> Self {
        self.train_size = Some(train_size);
        self
    }

    /// Configured number of splits.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Computes the fold ranges for a sequence of `n_samples`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no valid partition exists.
    pub fn folds(&self, n_samples: usize) -> Result<Vec<Fold>, EvalError> {
        match self.method {
            WindowMethod::Expanding => {
                expanding_window_split(n_samples, self.n_splits, self.test_size, None, self.gap)
            }
            WindowMethod::Rolling => rolling_window_split(
                n_samples,
                self.n_splits,
                self.train_size.unwrap_or(n_samples / 2),
                self.test_size,
                self.gap,
            ),
        }
    }

    /// Yields `(train_indices, test_indices)` for each fold.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no valid partition exists.
    pub fn split(&self, n_samples: usize) -> Result<Splits, EvalError> {
        Ok(Splits {
            folds: self.folds(n_samples)?.into_iter(),
        })
    }
}

/// Finite iterator of index pairs produced by `TimeSeriesSplit::split`.
#[derive(Debug, Clone)]
pub struct Splits {
    folds: std::vec::IntoIter<Fold>,
}

impl Iterator for Splits {
    type Item = (Vec<usize>, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        self.folds
            .next()
            .map(|f| (f.train_range().collect(), f.test_range().collect()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.folds.size_hint()
    }
}

impl ExactSizeIterator for Splits {}
