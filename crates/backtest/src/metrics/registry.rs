//! Named point metrics evaluated per fold by the walk-forward validator.

use std::fmt;

use forecast_eval_core::{EvalError, MetricsConfig};

use super::point::{mae, mape, rmse, smape};

type MetricFn = Box<dyn Fn(&[f64], &[f64]) -> Result<f64, EvalError> + Send + Sync>;

/// Ordered collection of `(name, fn(actual, predicted))` metrics.
///
/// The default registry holds MAE and RMSE.
pub struct MetricRegistry {
    metrics: Vec<(String, MetricFn)>,
}

impl MetricRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            metrics: Vec::new(),
        }
    }

    /// Registers an infallible metric. Inputs of unequal length are reported
    /// as `LengthMismatch` before the metric runs.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, metric: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        self.metrics.push((
            name.into(),
            Box::new(move |actual, predicted| {
                EvalError::check_len(actual.len(), predicted.len())?;
                Ok(metric(actual, predicted))
            }),
        ));
        self
    }

    /// Registers a metric that reports its own failures.
    #[must_use]
    pub fn register_fallible<F>(mut self, name: impl Into<String>, metric: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> Result<f64, EvalError> + Send + Sync + 'static,
    {
        self.metrics.push((name.into(), Box::new(metric)));
        self
    }

    /// Builds a registry from built-in metric names (`mae`, `rmse`, `mape`,
    /// `smape`), case-insensitive. MAPE uses `config.mape_epsilon`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unknown name.
    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        config: &MetricsConfig,
    ) -> Result<Self, EvalError> {
        let epsilon = config.mape_epsilon;
        names.iter().try_fold(Self::empty(), |registry, name| {
            let name = name.as_ref();
            match name.to_ascii_lowercase().as_str() {
                "mae" => Ok(registry.register("MAE", mae)),
                "rmse" => Ok(registry.register("RMSE", rmse)),
                "mape" => Ok(registry.register("MAPE", move |a: &[f64], p: &[f64]| {
                    mape(a, p, epsilon)
                })),
                "smape" => Ok(registry.register("SMAPE", smape)),
                other => Err(EvalError::config(format!("unknown metric '{other}'"))),
            }
        })
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Metrics in registration order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &(dyn Fn(&[f64], &[f64]) -> Result<f64, EvalError> + Send + Sync))>
    {
        self.metrics
            .iter()
            .map(|(name, metric)| (name.as_str(), metric.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::empty().register("MAE", mae).register("RMSE", rmse)
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_holds_mae_and_rmse() {
        assert_eq!(MetricRegistry::default().names(), vec!["MAE", "RMSE"]);
    }

    #[test]
    fn from_names_is_case_insensitive() {
        let registry = MetricRegistry::from_names(&["MAE", "smape", "Mape"], &MetricsConfig::default())
            .unwrap();
        assert_eq!(registry.names(), vec!["MAE", "SMAPE", "MAPE"]);
    }

    #[test]
    fn from_names_rejects_unknown_metric() {
        let err = MetricRegistry::from_names(&["mae", "hit_rate"], &MetricsConfig::default())
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidConfig(_)));
    }

    #[test]
    fn from_names_mape_uses_configured_epsilon() {
        let config = MetricsConfig {
            mape_epsilon: 1.0,
            ..MetricsConfig::default()
        };
        let registry = MetricRegistry::from_names(&["mape"], &config).unwrap();
        let (_, metric) = registry.iter().next().unwrap();
        // |0 - 1| / (|0| + 1) = 100%
        assert!((metric(&[0.0], &[1.0]).unwrap() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn registered_metric_checks_lengths() {
        let registry = MetricRegistry::default();
        let (_, metric) = registry.iter().next().unwrap();
        assert!(matches!(
            metric(&[1.0, 2.0], &[1.0]),
            Err(EvalError::LengthMismatch { .. })
        ));
        assert!((metric(&[1.0, 2.0], &[2.0, 2.0]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fallible_metric_error_is_returned() {
        let registry = MetricRegistry::empty()
            .register_fallible("Broken", |_, _| Err(EvalError::Metric("boom".into())));
        let (name, metric) = registry.iter().next().unwrap();
        assert_eq!(name, "Broken");
        assert!(metric(&[1.0], &[1.0]).is_err());
    }
}
