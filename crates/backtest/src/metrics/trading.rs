//! Trading performance metrics over period returns and equity curves.
//!
//! Degenerate inputs never error: each function documents the sentinel it
//! returns instead (`0.0`, `f64::INFINITY` or `f64::NAN`).

use serde::{Deserialize, Serialize};

use super::stats::{drop_nan, mean, percentile, population_std};

/// Standard deviations below this are treated as zero.
pub const MIN_STD: f64 = 1e-10;

/// Annualized Sharpe ratio.
///
/// NaN returns are dropped first. Fewer than two observations yield `NaN`;
/// a flat return series yields `0.0`. `risk_free_rate` is annual.
#[must_use]
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let returns = drop_nan(returns);
    if returns.len() < 2 {
        return f64::NAN;
    }

    let ppy = f64::from(periods_per_year);
    let std = population_std(&returns);
    if std < MIN_STD {
        return 0.0;
    }
    let excess = mean(&returns) - risk_free_rate / ppy;
    excess / std * ppy.sqrt()
}

/// Annualized Sortino ratio, penalising only downside deviation.
///
/// Fewer than two observations yield `NaN`. With fewer than two negative
/// returns, or a flat downside, the ratio is `+inf` when the mean excess
/// return is positive and `0.0` otherwise.
#[must_use]
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let returns = drop_nan(returns);
    if returns.len() < 2 {
        return f64::NAN;
    }

    let ppy = f64::from(periods_per_year);
    let excess = mean(&returns) - risk_free_rate / ppy;
    let unbounded = if excess > 0.0 { f64::INFINITY } else { 0.0 };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.len() < 2 {
        return unbounded;
    }
    let downside_std = population_std(&downside);
    if downside_std < MIN_STD {
        return unbounded;
    }
    excess / downside_std * ppy.sqrt()
}

/// Maximum drawdown with the indices that bound it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Largest peak-to-trough decline as a fraction (0.25 = 25%).
    pub max_drawdown: f64,
    /// Index of the equity peak preceding the trough.
    pub peak_idx: usize,
    /// Index of the deepest point.
    pub trough_idx: usize,
}

/// Drawdown series `(equity - running max) / running max`, every value `<= 0`.
#[must_use]
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut running_max = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&value| {
            running_max = running_max.max(value);
            (value - running_max) / running_max
        })
        .collect()
}

/// Maximum drawdown of an equity curve.
///
/// The trough is the first minimum of the drawdown series and the peak is
/// the first maximum of equity up to and including the trough. Curves with
/// fewer than two points yield a zero drawdown at index 0.
#[must_use]
pub fn max_drawdown(equity: &[f64]) -> Drawdown {
    if equity.len() < 2 {
        return Drawdown {
            max_drawdown: 0.0,
            peak_idx: 0,
            trough_idx: 0,
        };
    }

    let drawdowns = drawdown_series(equity);
    let mut trough_idx = 0;
    for (i, dd) in drawdowns.iter().enumerate() {
        if *dd < drawdowns[trough_idx] {
            trough_idx = i;
        }
    }

    let mut peak_idx = 0;
    for i in 0..=trough_idx {
        if equity[i] > equity[peak_idx] {
            peak_idx = i;
        }
    }

    Drawdown {
        max_drawdown: -drawdowns[trough_idx],
        peak_idx,
        trough_idx,
    }
}

/// Compounds period returns into a growth curve starting from `1 + r[0]`.
#[must_use]
pub fn cumulative_growth(returns: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth
        })
        .collect()
}

/// Geometric annualization of a total return earned over `n_periods`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn annualize_total_return(total_return: f64, n_periods: usize, periods_per_year: u32) -> f64 {
    if n_periods == 0 {
        return f64::NAN;
    }
    let years = n_periods as f64 / f64::from(periods_per_year);
    (1.0 + total_return).powf(1.0 / years) - 1.0
}

/// Calmar ratio: annualized compounded return over maximum drawdown.
///
/// When the drawdown is negligible the ratio is `+inf` for a positive
/// return and `0.0` otherwise.
#[must_use]
pub fn calmar_ratio(returns: &[f64], periods_per_year: u32) -> f64 {
    let growth = cumulative_growth(returns);
    let Some(&last) = growth.last() else {
        return f64::NAN;
    };
    let annual = annualize_total_return(last - 1.0, returns.len(), periods_per_year);

    let drawdown = max_drawdown(&growth).max_drawdown;
    if drawdown < MIN_STD {
        return if annual > 0.0 { f64::INFINITY } else { 0.0 };
    }
    annual / drawdown
}

/// Gross profit over gross loss.
///
/// Without losses the factor is `+inf` when any profit exists and `0.0`
/// otherwise.
#[must_use]
pub fn profit_factor(returns: &[f64]) -> f64 {
    let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = -returns.iter().filter(|r| **r < 0.0).sum::<f64>();

    if gross_loss < MIN_STD {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Fraction of periods with a strictly positive return.
#[must_use]
pub fn win_rate(returns: &[f64]) -> f64 {
    let wins: Vec<f64> = returns
        .iter()
        .map(|r| if *r > 0.0 { 1.0 } else { 0.0 })
        .collect();
    mean(&wins)
}

/// Historical value at risk: the `(1 - confidence)` percentile of returns.
#[must_use]
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    percentile(returns, (1.0 - confidence) * 100.0)
}

/// Conditional value at risk: mean of returns at or below the VaR.
#[must_use]
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    let var = value_at_risk(returns, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
    mean(&tail)
}

/// Tail-risk profile of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAdjustedReturn {
    pub var: f64,
    pub cvar: f64,
    /// Arithmetic annualization: `mean * periods_per_year`.
    pub annual_return: f64,
    pub annual_volatility: f64,
    /// `+inf` when the VaR is non-negative.
    pub return_over_var: f64,
    /// `+inf` when the CVaR is non-negative.
    pub return_over_cvar: f64,
}

#[must_use]
pub fn risk_adjusted_return(
    returns: &[f64],
    confidence: f64,
    periods_per_year: u32,
) -> RiskAdjustedReturn {
    let ppy = f64::from(periods_per_year);
    let var = value_at_risk(returns, confidence);
    let cvar = conditional_value_at_risk(returns, confidence);
    let annual_return = mean(returns) * ppy;
    let annual_volatility = population_std(returns) * ppy.sqrt();

    RiskAdjustedReturn {
        var,
        cvar,
        annual_return,
        annual_volatility,
        return_over_var: if var < 0.0 { annual_return / -var } else { f64::INFINITY },
        return_over_cvar: if cvar < 0.0 { annual_return / -cvar } else { f64::INFINITY },
    }
}
