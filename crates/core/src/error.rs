//! Error taxonomy shared by every crate in the workspace.
//!
//! Degenerate numeric conditions (zero variance, empty denominators) are not
//! errors; metric functions resolve them to sentinel values instead.

use thiserror::Error;

/// Errors raised by the evaluation and backtesting engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A fold or backtest configuration that cannot produce a valid run.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// A read method was called before any run produced results.
    #[error("No results available: call {0} first")]
    NotRun(&'static str),

    /// Two inputs that must be aligned have different lengths.
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A named column is absent from a frame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A metric could not be computed for the given inputs.
    #[error("Metric error: {0}")]
    Metric(String),
}

impl EvalError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns an error if `actual` differs from `expected`.
    ///
    /// # Errors
    /// Returns `LengthMismatch` when the lengths differ.
    pub fn check_len(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::LengthMismatch { expected, actual })
        }
    }
}
