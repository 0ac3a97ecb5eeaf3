use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::traits::{PositionSizer, SizingContext};

/// Direction of a signal: `1.0` long, `-1.0` short, `0.0` flat.
///
/// Zero and missing (`NaN`) signals are flat.
#[must_use]
pub fn signal_direction(signal: f64) -> f64 {
    if signal > 0.0 {
        1.0
    } else if signal < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Default sizer: scales the raw signal by the maximum position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledSignalSizer {
    pub max_position: f64,
}

impl ScaledSignalSizer {
    #[must_use]
    pub const fn new(max_position: f64) -> Self {
        Self { max_position }
    }
}

impl PositionSizer for ScaledSignalSizer {
    fn target_position(&self, ctx: &SizingContext) -> f64 {
        if ctx.signal.is_nan() {
            return 0.0;
        }
        ctx.signal * self.max_position
    }

    fn name(&self) -> &str {
        "scaled_signal"
    }
}

/// Scales position size with forecast confidence.
///
/// Below `confidence_threshold` no position is taken. At the threshold the
/// position is `base_position`, rising linearly to 1.0 at full confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSizer {
    pub base_position: f64,
    pub confidence_threshold: f64,
}

impl Default for ConfidenceSizer {
    fn default() -> Self {
        Self {
            base_position: 0.5,
            confidence_threshold: 0.7,
        }
    }
}

impl ConfidenceSizer {
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `0 <= threshold < 1` and `0 <= base <= 1`.
    pub fn new(base_position: f64, confidence_threshold: f64) -> Result<Self, EvalError> {
        if !(0.0..1.0).contains(&confidence_threshold) {
            return Err(EvalError::config("confidence_threshold must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&base_position) {
            return Err(EvalError::config("base_position must be in [0, 1]"));
        }
        Ok(Self {
            base_position,
            confidence_threshold,
        })
    }

    #[must_use]
    pub fn size(&self, signal: f64, confidence: f64) -> f64 {
        if confidence.is_nan() || confidence < self.confidence_threshold {
            return 0.0;
        }
        let scale =
            (confidence - self.confidence_threshold) / (1.0 - self.confidence_threshold);
        let position = self.base_position + scale * (1.0 - self.base_position);
        position * signal_direction(signal)
    }
}

/// Confidence sizing driven by a per-period confidence series.
#[derive(Debug, Clone)]
pub struct ForecastConfidenceSizer {
    sizer: ConfidenceSizer,
    confidences: Vec<f64>,
}

impl ForecastConfidenceSizer {
    #[must_use]
    pub fn new(sizer: ConfidenceSizer, confidences: Vec<f64>) -> Self {
        Self { sizer, confidences }
    }
}

impl PositionSizer for ForecastConfidenceSizer {
    fn target_position(&self, ctx: &SizingContext) -> f64 {
        self.confidences
            .get(ctx.period)
            .map_or(0.0, |&c| self.sizer.size(ctx.signal, c))
    }

    fn name(&self) -> &str {
        "confidence"
    }
}
