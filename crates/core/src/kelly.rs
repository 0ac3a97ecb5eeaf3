//! Kelly Criterion sizing for continuous-return forecasts.
//!
//! Sizes a position from a probabilistic return forecast, shrinking the full
//! Kelly fraction to guard against estimation error in the forecast itself.

use serde::{Deserialize, Serialize};

use crate::position_sizing::signal_direction;
use crate::traits::{PositionSizer, SizingContext};

/// Forecast standard deviations at or below this are treated as degenerate.
pub const MIN_PREDICTED_STD: f64 = 1e-10;

/// Kelly position sizer with forecast uncertainty.
///
/// For a Gaussian return forecast with mean `mu` and standard deviation
/// `sigma`, the growth-optimal leverage is:
/// ```text
/// f* = (mu - r_f) / sigma^2
/// ```
/// The position is `fraction * sign(signal) * f*`, clipped to `±max_leverage`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellySizer {
    /// Fraction of Kelly to use (0.5 = half Kelly)
    pub fraction: f64,
    /// Per-period risk-free rate subtracted from the predicted return
    pub risk_free_rate: f64,
    /// Maximum absolute position
    pub max_leverage: f64,
}

impl Default for KellySizer {
    fn default() -> Self {
        Self {
            fraction: 0.5,
            risk_free_rate: 0.0,
            max_leverage: 1.0,
        }
    }
}

/// Reason for a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingReason {
    /// Position taken within the leverage limit
    Sized,
    /// Position taken but clipped to the leverage limit
    Capped,
    /// No position - signal is flat or missing
    FlatSignal,
    /// No position - forecast has (near) zero uncertainty or is not finite
    DegenerateForecast,
}

/// Result of a Kelly sizing calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyDecision {
    /// Final signed position
    pub position: f64,
    /// Full Kelly leverage before fractional scaling and clipping
    pub full_kelly: f64,
    pub reason: SizingReason,
}

impl KellySizer {
    #[must_use]
    pub fn new(fraction: f64, risk_free_rate: f64, max_leverage: f64) -> Self {
        Self {
            fraction,
            risk_free_rate,
            max_leverage,
        }
    }

    /// Calculates the position for one forecast.
    ///
    /// # Examples
    /// ```
    /// use forecast_eval_core::kelly::KellySizer;
    ///
    /// let sizer = KellySizer::new(0.5, 0.0, 1.0);
    /// // f* = 0.001 / 0.02^2 = 2.5, half Kelly = 1.25, clipped to 1.0
    /// assert_eq!(sizer.size(1.0, 0.001, 0.02), 1.0);
    /// ```
    #[must_use]
    pub fn size(&self, signal: f64, predicted_return: f64, predicted_std: f64) -> f64 {
        self.decide(signal, predicted_return, predicted_std).position
    }

    /// Calculates the position together with the reason for it.
    #[must_use]
    pub fn decide(&self, signal: f64, predicted_return: f64, predicted_std: f64) -> KellyDecision {
        if !predicted_std.is_finite()
            || !predicted_return.is_finite()
            || predicted_std < MIN_PREDICTED_STD
        {
            return KellyDecision {
                position: 0.0,
                full_kelly: 0.0,
                reason: SizingReason::DegenerateForecast,
            };
        }

        let full_kelly = (predicted_return - self.risk_free_rate) / (predicted_std * predicted_std);
        let direction = signal_direction(signal);
        if direction == 0.0 {
            return KellyDecision {
                position: 0.0,
                full_kelly,
                reason: SizingReason::FlatSignal,
            };
        }

        let raw = full_kelly * self.fraction * direction;
        let position = raw.clamp(-self.max_leverage, self.max_leverage);
        let reason = if (position - raw).abs() > f64::EPSILON {
            SizingReason::Capped
        } else {
            SizingReason::Sized
        };

        KellyDecision {
            position,
            full_kelly,
            reason,
        }
    }
}

/// Kelly sizing driven by per-period return forecasts.
///
/// At each backtest step the forecast for the signal's period is used. Periods
/// without a forecast size to flat.
#[derive(Debug, Clone)]
pub struct ForecastKellySizer {
    sizer: KellySizer,
    predicted_returns: Vec<f64>,
    predicted_stds: Vec<f64>,
}

impl ForecastKellySizer {
    #[must_use]
    pub fn new(sizer: KellySizer, predicted_returns: Vec<f64>, predicted_stds: Vec<f64>) -> Self {
        Self {
            sizer,
            predicted_returns,
            predicted_stds,
        }
    }
}

impl PositionSizer for ForecastKellySizer {
    fn target_position(&self, ctx: &SizingContext) -> f64 {
        match (
            self.predicted_returns.get(ctx.period),
            self.predicted_stds.get(ctx.period),
        ) {
            (Some(&mu), Some(&sigma)) => self.sizer.size(ctx.signal, mu, sigma),
            _ => 0.0,
        }
    }

    fn name(&self) -> &str {
        "kelly"
    }
}
