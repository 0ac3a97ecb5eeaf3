#![allow(clippy::format_push_string)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::BacktestSummary;
use crate::walk_forward::ValidationSummary;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────\n";

/// One named metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: f64,
}

/// Ordered two-column `Metric | Value` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable {
    rows: Vec<MetricRow>,
}

impl MetricTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row, keeping insertion order.
    pub fn push(&mut self, metric: impl Into<String>, value: f64) {
        self.rows.push(MetricRow {
            metric: metric.into(),
            value,
        });
    }

    #[must_use]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.metric == metric)
            .map(|row| row.value)
    }

    #[must_use]
    pub fn contains(&self, metric: &str) -> bool {
        self.get(metric).is_some()
    }

    #[must_use]
    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.metric.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for MetricTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|row| row.metric.len())
            .max()
            .unwrap_or(0)
            .max("Metric".len());

        writeln!(f, "{:<width$}  {:>14}", "Metric", "Value")?;
        writeln!(f, "{}  {}", "-".repeat(width), "-".repeat(14))?;
        for row in &self.rows {
            writeln!(f, "{:<width$}  {:>14.4}", row.metric, row.value)?;
        }
        Ok(())
    }
}

/// Renders console reports for validation and backtest runs.
pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format_backtest(summary: &BacktestSummary) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str("                    BACKTEST RESULTS                           \n");
        output.push_str(RULE_HEAVY);
        output.push('\n');

        output.push_str("Portfolio Performance\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Final Equity:          ${:.2}\n", summary.final_equity));
        output.push_str(&format!("Total Return:          {:.2}%\n", summary.total_return * 100.0));
        output.push_str(&format!("Annual Return:         {:.2}%\n", summary.annual_return * 100.0));
        output.push_str(&format!(
            "Annual Volatility:     {:.2}%\n",
            summary.annual_volatility * 100.0
        ));
        output.push_str(&format!("Max Drawdown:          {:.2}%\n", summary.max_drawdown * 100.0));
        output.push('\n');

        output.push_str("Risk-Adjusted\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Sharpe Ratio:          {:.4}\n", summary.sharpe_ratio));
        output.push_str(&format!("Sortino Ratio:         {:.4}\n", summary.sortino_ratio));
        output.push('\n');

        output.push_str("Trade Statistics\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Total Trades:          {}\n", summary.num_trades));
        output.push_str(&format!("Win Rate:              {:.2}%\n", summary.win_rate * 100.0));
        output.push_str(&format!("Profit Factor:         {:.4}\n", summary.profit_factor));
        output.push('\n');
        output.push_str(RULE_HEAVY);

        output
    }

    #[must_use]
    pub fn format_validation(summary: &ValidationSummary) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str("               WALK-FORWARD VALIDATION RESULTS                 \n");
        output.push_str(RULE_HEAVY);
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "Metric", "Mean", "Std", "Min", "Max", "Median"
        ));
        output.push_str(RULE_LIGHT);
        for (name, stats) in &summary.metrics {
            output.push_str(&format!(
                "{:<20} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}\n",
                name, stats.mean, stats.std, stats.min, stats.max, stats.median
            ));
        }
        output.push('\n');
        output.push_str(&format!("Folds:                 {}\n", summary.n_folds));
        output.push_str(RULE_HEAVY);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_table_preserves_insertion_order() {
        let mut table = MetricTable::new();
        table.push("RMSE", 2.0);
        table.push("MAE", 1.0);

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["RMSE", "MAE"]);
        assert_eq!(table.get("MAE"), Some(1.0));
        assert_eq!(table.get("CRPS"), None);
    }

    #[test]
    fn metric_table_serializes_as_row_list() {
        let mut table = MetricTable::new();
        table.push("MAE", 0.5);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"metric":"MAE","value":0.5}]"#);
    }

    #[test]
    fn metric_table_display_lists_every_row() {
        let mut table = MetricTable::new();
        table.push("Sharpe Ratio", 1.25);
        table.push("Win Rate (%)", 55.0);
        let rendered = table.to_string();

        assert!(rendered.starts_with("Metric"));
        assert!(rendered.contains("Sharpe Ratio"));
        assert!(rendered.contains("55.0000"));
    }
}
