//! Single-asset bar-by-bar backtester.
//!
//! The position held over bar `t` is sized from the signal observed at bar
//! `t - 1`, so a signal can never trade on the price it was formed from.
//! Equity follows
//! `equity[t] = cash[t] + position[t] * equity[t-1] * price[t] / price[t-1]`.

use forecast_eval_core::{
    BacktestConfig, EvalError, IndexLabel, PositionSizer, ScaledSignalSizer, SizingContext,
    TimeSeriesFrame,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::metrics::stats::population_std;
use crate::metrics::trading::{
    drawdown_series, max_drawdown, profit_factor, sharpe_ratio, sortino_ratio, win_rate,
};
use crate::report::MetricTable;

/// Position changes at or below this fraction of equity are not traded.
pub const TRADE_THRESHOLD: f64 = 0.001;

/// State at the end of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestStep {
    pub price: f64,
    /// Signal observed at this bar (acted on at the next bar). `NaN` reads as 0.
    pub signal: f64,
    /// Signed fraction of equity held over this bar.
    pub position: f64,
    pub cash: f64,
    pub equity: f64,
    pub returns: f64,
    pub trade: bool,
    pub cumulative_return: f64,
    /// `(equity - running max) / running max`, never positive.
    pub drawdown: f64,
}

/// Full state sequence of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub index: Vec<IndexLabel>,
    pub steps: Vec<BacktestStep>,
    pub sizer: String,
}

impl BacktestResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn equity(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.equity).collect()
    }

    #[must_use]
    pub fn positions(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.position).collect()
    }

    #[must_use]
    pub fn returns(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.returns).collect()
    }

    #[must_use]
    pub fn num_trades(&self) -> usize {
        self.steps.iter().filter(|s| s.trade).count()
    }

    #[must_use]
    pub fn final_equity(&self) -> f64 {
        self.steps.last().map_or(f64::NAN, |s| s.equity)
    }

    /// Per-bar table with columns `price, signal, position, equity, cash,
    /// returns, trade, cumulative_return, drawdown`.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the index does not cover every step.
    pub fn to_frame(&self) -> Result<TimeSeriesFrame, EvalError> {
        let column = |f: fn(&BacktestStep) -> f64| self.steps.iter().map(f).collect::<Vec<_>>();

        TimeSeriesFrame::new(self.index.clone())
            .with_column("price", column(|s| s.price))?
            .with_column("signal", column(|s| s.signal))?
            .with_column("position", column(|s| s.position))?
            .with_column("equity", column(|s| s.equity))?
            .with_column("cash", column(|s| s.cash))?
            .with_column("returns", column(|s| s.returns))?
            .with_column("trade", column(|s| if s.trade { 1.0 } else { 0.0 }))?
            .with_column("cumulative_return", column(|s| s.cumulative_return))?
            .with_column("drawdown", column(|s| s.drawdown))
    }
}

/// Performance of a completed run. Returns and drawdowns are fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub num_trades: usize,
    pub final_equity: f64,
}

impl BacktestSummary {
    /// Report table with percentage-scaled rows.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn to_table(&self) -> MetricTable {
        let mut table = MetricTable::new();
        table.push("Total Return (%)", self.total_return * 100.0);
        table.push("Annual Return (%)", self.annual_return * 100.0);
        table.push("Annual Volatility (%)", self.annual_volatility * 100.0);
        table.push("Sharpe Ratio", self.sharpe_ratio);
        table.push("Sortino Ratio", self.sortino_ratio);
        table.push("Max Drawdown (%)", self.max_drawdown * 100.0);
        table.push("Win Rate (%)", self.win_rate * 100.0);
        table.push("Profit Factor", self.profit_factor);
        table.push("Total Trades", self.num_trades as f64);
        table.push("Final Equity", self.final_equity);
        table
    }
}

/// Simulates a signal-driven strategy and keeps the most recent run.
#[derive(Debug, Clone, Default)]
pub struct Backtester {
    config: BacktestConfig,
    results: Option<BacktestResult>,
}

impl Backtester {
    #[must_use]
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            results: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    #[must_use]
    pub fn results(&self) -> Option<&BacktestResult> {
        self.results.as_ref()
    }

    /// Runs over positionally aligned prices and signals.
    ///
    /// `max_position` overrides the configured limit for this run; `None`
    /// uses `BacktestConfig::max_position`. `sizer` defaults to scaling the
    /// raw signal by the limit, and every target is clipped to `±limit`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid configuration, an empty or
    /// non-positive price series or a non-positive `max_position`, and
    /// `LengthMismatch` when signals and prices differ in length.
    #[allow(clippy::cast_possible_wrap)]
    pub fn run(
        &mut self,
        prices: &[f64],
        signals: &[f64],
        sizer: Option<&dyn PositionSizer>,
        max_position: Option<f64>,
    ) -> Result<&BacktestResult, EvalError> {
        let index = (0..prices.len() as i64).map(IndexLabel::Position).collect();
        self.run_indexed(index, prices, signals, sizer, max_position)
    }

    /// Runs over the price and signal columns of a frame, keeping its index.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` for an absent column, plus the errors of
    /// [`Backtester::run`].
    pub fn run_frame(
        &mut self,
        data: &TimeSeriesFrame,
        price_col: &str,
        signal_col: &str,
        sizer: Option<&dyn PositionSizer>,
        max_position: Option<f64>,
    ) -> Result<&BacktestResult, EvalError> {
        let prices = data.require_column(price_col)?;
        let signals = data.require_column(signal_col)?;
        self.run_indexed(data.index().to_vec(), prices, signals, sizer, max_position)
    }

    fn run_indexed(
        &mut self,
        index: Vec<IndexLabel>,
        prices: &[f64],
        signals: &[f64],
        sizer: Option<&dyn PositionSizer>,
        max_position: Option<f64>,
    ) -> Result<&BacktestResult, EvalError> {
        self.config.validate()?;
        if prices.is_empty() {
            return Err(EvalError::config("price series is empty"));
        }
        EvalError::check_len(prices.len(), signals.len())?;
        if let Some(bad) = prices.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
            return Err(EvalError::config(format!("prices must be positive, got {bad}")));
        }
        let max_position = max_position.unwrap_or(self.config.max_position);
        if !(max_position.is_finite() && max_position > 0.0) {
            return Err(EvalError::config("max_position must be positive"));
        }

        let default_sizer = ScaledSignalSizer::new(max_position);
        let sizer: &dyn PositionSizer = sizer.unwrap_or(&default_sizer);

        info!(
            "Starting backtest: {} periods, sizer {}, initial capital {:.2}",
            prices.len(),
            sizer.name(),
            self.config.initial_capital
        );

        let steps = self.simulate(prices, signals, sizer, max_position);
        let result = BacktestResult {
            index,
            steps,
            sizer: sizer.name().to_string(),
        };

        info!(
            "Backtest complete: {} trades, final equity {:.2}",
            result.num_trades(),
            result.final_equity()
        );
        Ok(self.results.insert(result))
    }

    fn simulate(
        &self,
        prices: &[f64],
        signals: &[f64],
        sizer: &dyn PositionSizer,
        max_position: f64,
    ) -> Vec<BacktestStep> {
        let initial = self.config.initial_capital;
        let signal_at = |t: usize| if signals[t].is_nan() { 0.0 } else { signals[t] };

        let mut steps = Vec::with_capacity(prices.len());
        steps.push(BacktestStep {
            price: prices[0],
            signal: signal_at(0),
            position: 0.0,
            cash: initial,
            equity: initial,
            returns: 0.0,
            trade: false,
            cumulative_return: 0.0,
            drawdown: 0.0,
        });

        for t in 1..prices.len() {
            let prev = steps[t - 1];
            let price = prices[t];

            let ctx = SizingContext {
                period: t - 1,
                signal: prev.signal,
                price,
                equity: prev.equity,
            };
            let target = sizer.target_position(&ctx);
            let target = if target.is_nan() {
                0.0
            } else {
                target.clamp(-max_position, max_position)
            };

            let change = target - prev.position;
            let (position, cash, trade) = if change.abs() > TRADE_THRESHOLD {
                let execution_price = if change > 0.0 {
                    price * (1.0 + self.config.slippage)
                } else {
                    price * (1.0 - self.config.slippage)
                };
                let notional = (change * prev.equity).abs();
                let cost = notional * self.config.transaction_cost
                    + notional * (execution_price - price).abs() / price;

                debug!(
                    "Trade at period {}: position {:.4} -> {:.4}, execution {:.4}, cost {:.2}",
                    t, prev.position, target, execution_price, cost
                );
                (target, prev.cash - change * prev.equity - cost, true)
            } else {
                (prev.position, prev.cash, false)
            };

            let equity = cash + position * prev.equity * (price / prices[t - 1]);
            let returns = equity / prev.equity - 1.0;

            steps.push(BacktestStep {
                price,
                signal: signal_at(t),
                position,
                cash,
                equity,
                returns,
                trade,
                cumulative_return: (1.0 + prev.cumulative_return) * (1.0 + returns) - 1.0,
                drawdown: 0.0,
            });
        }

        let equity: Vec<f64> = steps.iter().map(|s| s.equity).collect();
        for (step, dd) in steps.iter_mut().zip(drawdown_series(&equity)) {
            step.drawdown = dd;
        }
        steps
    }

    /// Summary statistics of the most recent run.
    ///
    /// Annual return is `(final / initial)^(periods_per_year / len) - 1`.
    ///
    /// # Errors
    ///
    /// Returns `NotRun` before a successful `run`.
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Result<BacktestSummary, EvalError> {
        let result = self.results.as_ref().ok_or(EvalError::NotRun("run()"))?;
        let ppy = self.config.periods_per_year;
        let equity = result.equity();
        let returns = result.returns();

        let growth = result.final_equity() / equity[0];
        Ok(BacktestSummary {
            total_return: growth - 1.0,
            annual_return: growth.powf(f64::from(ppy) / equity.len() as f64) - 1.0,
            annual_volatility: population_std(&returns) * f64::from(ppy).sqrt(),
            sharpe_ratio: sharpe_ratio(&returns, 0.0, ppy),
            sortino_ratio: sortino_ratio(&returns, 0.0, ppy),
            max_drawdown: max_drawdown(&equity).max_drawdown,
            win_rate: win_rate(&returns),
            profit_factor: profit_factor(&returns),
            num_trades: result.num_trades(),
            final_equity: result.final_equity(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_eval_core::FnSizer;

    fn frictionless() -> Backtester {
        Backtester::new(BacktestConfig {
            transaction_cost: 0.0,
            slippage: 0.0,
            ..BacktestConfig::default()
        })
    }

    // ============================================================
    // Simulation Tests
    // ============================================================

    #[test]
    fn run_fully_invested_tracks_price() {
        let mut bt = frictionless();
        let result = bt.run(&[100.0, 102.0, 101.0], &[1.0, 1.0, 1.0], None, Some(1.0)).unwrap();

        assert_eq!(result.positions(), vec![0.0, 1.0, 1.0]);
        let equity = result.equity();
        assert!((equity[1] - 102_000.0).abs() < 1e-6);
        assert!((equity[2] - 101_000.0).abs() < 1e-6);
        assert_eq!(result.num_trades(), 1);
        assert!(result.steps[1].trade);
    }

    #[test]
    fn run_uses_previous_bar_signal() {
        let mut bt = frictionless();
        // the short signal at bar 1 only takes effect at bar 2
        let result = bt.run(&[100.0, 110.0, 99.0], &[0.0, -1.0, 0.0], None, Some(1.0)).unwrap();

        assert_eq!(result.positions(), vec![0.0, 0.0, -1.0]);
        assert!((result.steps[1].equity - 100_000.0).abs() < 1e-9);
        assert!((result.steps[2].returns - 0.1).abs() < 1e-9);
    }

    #[test]
    fn run_is_idempotent() {
        let prices = [100.0, 101.0, 99.5, 102.0, 103.5, 100.0];
        let signals = [0.3, -0.7, 1.0, 0.0, -1.0, 0.5];
        let mut bt = Backtester::default();

        let first = bt.run(&prices, &signals, None, Some(1.0)).unwrap().clone();
        let second = bt.run(&prices, &signals, None, Some(1.0)).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn run_charges_transaction_cost_and_slippage() {
        let mut bt = Backtester::new(BacktestConfig {
            transaction_cost: 0.001,
            slippage: 0.0005,
            ..BacktestConfig::default()
        });
        let result = bt.run(&[100.0, 102.0], &[1.0, 1.0], None, Some(1.0)).unwrap();

        // notional 100_000: 100 commission + 50 slippage
        assert!((result.steps[1].cash + 150.0).abs() < 1e-6);
        assert!((result.steps[1].equity - 101_850.0).abs() < 1e-6);
    }

    #[test]
    fn run_ignores_changes_inside_dead_band() {
        let mut bt = frictionless();
        let result = bt
            .run(&[100.0, 100.0, 100.0], &[0.5, 0.5005, 0.5], None, Some(1.0))
            .unwrap();
        assert_eq!(result.positions(), vec![0.0, 0.5, 0.5]);
        assert_eq!(result.num_trades(), 1);
    }

    #[test]
    fn run_treats_nan_signal_as_flat() {
        let mut bt = frictionless();
        let result = bt
            .run(&[100.0, 101.0, 102.0], &[f64::NAN, 1.0, 1.0], None, Some(1.0))
            .unwrap();
        assert_eq!(result.positions(), vec![0.0, 0.0, 1.0]);
        assert_eq!(result.steps[0].signal, 0.0);
    }

    #[test]
    fn run_clips_sizer_output_to_max_position() {
        let mut bt = frictionless();
        let aggressive = FnSizer(|signal: f64, _price: f64, _equity: f64| signal * 10.0);
        let result = bt
            .run(&[100.0, 101.0, 102.0], &[1.0, -1.0, 0.0], Some(&aggressive), Some(0.5))
            .unwrap();
        assert_eq!(result.positions(), vec![0.0, 0.5, -0.5]);
        assert_eq!(result.sizer, "custom");
    }

    #[test]
    fn run_without_limit_uses_configured_max_position() {
        let mut bt = Backtester::new(BacktestConfig {
            transaction_cost: 0.0,
            slippage: 0.0,
            max_position: 0.5,
            ..BacktestConfig::default()
        });
        let prices = [100.0, 101.0, 102.0];
        let signals = [1.0, 1.0, 1.0];

        let configured = bt.run(&prices, &signals, None, None).unwrap();
        assert_eq!(configured.positions(), vec![0.0, 0.5, 0.5]);

        let overridden = bt.run(&prices, &signals, None, Some(0.25)).unwrap();
        assert_eq!(overridden.positions(), vec![0.0, 0.25, 0.25]);
    }

    #[test]
    fn run_rejects_misaligned_or_empty_inputs() {
        let mut bt = Backtester::default();
        assert!(matches!(
            bt.run(&[100.0, 101.0], &[1.0], None, Some(1.0)),
            Err(EvalError::LengthMismatch { .. })
        ));
        assert!(matches!(
            bt.run(&[], &[], None, Some(1.0)),
            Err(EvalError::InvalidConfig(_))
        ));
        assert!(matches!(
            bt.run(&[100.0, 0.0], &[1.0, 1.0], None, Some(1.0)),
            Err(EvalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn drawdown_column_is_non_positive() {
        let mut bt = frictionless();
        let result = bt
            .run(&[100.0, 120.0, 90.0, 95.0], &[1.0; 4], None, Some(1.0))
            .unwrap();
        assert!(result.steps.iter().all(|s| s.drawdown <= 0.0));
        assert!((result.steps[2].drawdown + 0.25).abs() < 1e-9);
    }

    #[test]
    fn to_frame_has_result_columns() {
        let mut bt = frictionless();
        let frame = bt
            .run(&[100.0, 101.0], &[1.0, 1.0], None, Some(1.0))
            .unwrap()
            .to_frame()
            .unwrap();
        let names: Vec<&str> = frame.column_names().collect();
        assert_eq!(
            names,
            vec![
                "price",
                "signal",
                "position",
                "equity",
                "cash",
                "returns",
                "trade",
                "cumulative_return",
                "drawdown"
            ]
        );
        assert_eq!(frame.column("trade").unwrap(), &[0.0, 1.0]);
    }

    // ============================================================
    // Summary Tests
    // ============================================================

    #[test]
    fn summary_before_run_is_not_run_error() {
        let bt = Backtester::default();
        assert_eq!(bt.summary(), Err(EvalError::NotRun("run()")));
    }

    #[test]
    fn summary_reports_returns_and_trades() {
        let mut bt = frictionless();
        bt.run(&[100.0, 110.0, 121.0], &[1.0, 1.0, 1.0], None, Some(1.0))
            .unwrap();
        let summary = bt.summary().unwrap();

        assert!((summary.total_return - 0.21).abs() < 1e-9);
        assert_eq!(summary.num_trades, 1);
        assert!((summary.final_equity - 121_000.0).abs() < 1e-6);
        assert_eq!(summary.max_drawdown, 0.0);
        let expected_annual = 1.21_f64.powf(252.0 / 3.0) - 1.0;
        assert!((summary.annual_return - expected_annual).abs() / expected_annual < 1e-9);
        assert_eq!(summary.to_table().get("Total Trades"), Some(1.0));
    }
}
