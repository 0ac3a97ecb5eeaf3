use serde::{Deserialize, Serialize};

use crate::error::EvalError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub validation: ValidationConfig,
    pub backtest: BacktestConfig,
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first `InvalidConfig` reported by a section.
    pub fn validate(&self) -> Result<(), EvalError> {
        self.validation.validate()?;
        self.backtest.validate()?;
        self.metrics.validate()
    }
}

/// Training-window policy for fold generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMethod {
    /// Train always starts at 0 and grows each fold.
    #[default]
    Expanding,
    /// Train has a fixed size and slides forward.
    Rolling,
}

impl std::str::FromStr for WindowMethod {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expanding" | "anchored" => Ok(Self::Expanding),
            "rolling" => Ok(Self::Rolling),
            other => Err(EvalError::config(format!("Unknown window method: {other}"))),
        }
    }
}

impl std::fmt::Display for WindowMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expanding => write!(f, "expanding"),
            Self::Rolling => write!(f, "rolling"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub n_folds: usize,
    /// Observations per test window.
    pub test_size: usize,
    /// Observations skipped between train and test.
    pub gap: usize,
    pub method: WindowMethod,
    /// Fixed training size for rolling mode (defaults to half the series).
    pub train_size: Option<usize>,
    /// Refit every fold; otherwise the first fold's model is reused.
    pub refit: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            test_size: 30,
            gap: 0,
            method: WindowMethod::Expanding,
            train_size: None,
            refit: true,
        }
    }
}

impl ValidationConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero fold count, test size or train size.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.n_folds == 0 {
            return Err(EvalError::config("n_folds must be at least 1"));
        }
        if self.test_size == 0 {
            return Err(EvalError::config("test_size must be at least 1"));
        }
        if self.train_size == Some(0) {
            return Err(EvalError::config("train_size must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Cost per trade as a fraction of traded notional.
    pub transaction_cost: f64,
    /// Execution price adjustment as a fraction of price.
    pub slippage: f64,
    /// Maximum absolute position as a fraction of equity, used when a run
    /// does not pass its own limit.
    pub max_position: f64,
    pub periods_per_year: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            transaction_cost: 0.001,
            slippage: 0.0005,
            max_position: 1.0,
            periods_per_year: 252,
        }
    }
}

impl BacktestConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` when capital, costs or position limits are out of range.
    pub fn validate(&self) -> Result<(), EvalError> {
        if !(self.initial_capital > 0.0) {
            return Err(EvalError::config("initial_capital must be positive"));
        }
        if !(self.transaction_cost >= 0.0) {
            return Err(EvalError::config("transaction_cost must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.slippage) {
            return Err(EvalError::config("slippage must be in [0, 1)"));
        }
        if !(self.max_position > 0.0) {
            return Err(EvalError::config("max_position must be positive"));
        }
        if self.periods_per_year == 0 {
            return Err(EvalError::config("periods_per_year must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub periods_per_year: u32,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    pub calibration_bins: usize,
    /// Significance level of the intervals scored by the Winkler score.
    pub winkler_alpha: f64,
    pub var_confidence: f64,
    pub mape_epsilon: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
            risk_free_rate: 0.0,
            calibration_bins: 10,
            winkler_alpha: 0.05,
            var_confidence: 0.95,
            mape_epsilon: 1e-10,
        }
    }
}

impl MetricsConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for out-of-range levels or bin counts.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.periods_per_year == 0 {
            return Err(EvalError::config("periods_per_year must be at least 1"));
        }
        if self.calibration_bins == 0 {
            return Err(EvalError::config("calibration_bins must be at least 1"));
        }
        if !(self.winkler_alpha > 0.0 && self.winkler_alpha < 1.0) {
            return Err(EvalError::config("winkler_alpha must be in (0, 1)"));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(EvalError::config("var_confidence must be in (0, 1)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_settings() {
        let config = AppConfig::default();
        assert_eq!(config.validation.n_folds, 5);
        assert_eq!(config.validation.test_size, 30);
        assert!(config.validation.refit);
        assert_eq!(config.validation.method, WindowMethod::Expanding);
        assert!((config.backtest.initial_capital - 100_000.0).abs() < f64::EPSILON);
        assert!((config.backtest.transaction_cost - 0.001).abs() < f64::EPSILON);
        assert!((config.backtest.slippage - 0.0005).abs() < f64::EPSILON);
        assert_eq!(config.metrics.calibration_bins, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_zero_folds() {
        let config = ValidationConfig {
            n_folds: 0,
            ..ValidationConfig::default()
        };
        assert!(matches!(config.validate(), Err(EvalError::InvalidConfig(_))));
    }

    #[test]
    fn backtest_rejects_negative_cost() {
        let config = BacktestConfig {
            transaction_cost: -0.01,
            ..BacktestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn backtest_rejects_nan_capital() {
        let config = BacktestConfig {
            initial_capital: f64::NAN,
            ..BacktestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn window_method_parses_case_insensitively() {
        assert_eq!("Rolling".parse::<WindowMethod>().unwrap(), WindowMethod::Rolling);
        assert_eq!(
            "expanding".parse::<WindowMethod>().unwrap(),
            WindowMethod::Expanding
        );
        assert!("sliding".parse::<WindowMethod>().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"validation": {"n_folds": 3, "method": "rolling"}}"#)
                .unwrap();
        assert_eq!(config.validation.n_folds, 3);
        assert_eq!(config.validation.method, WindowMethod::Rolling);
        assert_eq!(config.validation.test_size, 30);
        assert_eq!(config.backtest.periods_per_year, 252);
    }
}
