use crate::domain::errors::FactorEngineError;
use std::str::FromStr;

/// Error metric used when evaluating a model against record targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMetric {
    #[default]
    Mse,
    Mae,
    Rmse,
}

impl ErrorMetric {
    /// Computes the metric over paired predictions and targets.
    /// Returns 0.0 for empty input; callers reject empty evaluation sets first.
    pub fn compute(&self, predictions: &[f64], targets: &[f64]) -> f64 {
        let n = predictions.len().min(targets.len());
        if n == 0 {
            return 0.0;
        }

        let pairs = predictions.iter().zip(targets.iter()).take(n);
        match self {
            ErrorMetric::Mse => pairs.map(|(p, t)| (p - t).powi(2)).sum::<f64>() / n as f64,
            ErrorMetric::Mae => pairs.map(|(p, t)| (p - t).abs()).sum::<f64>() / n as f64,
            ErrorMetric::Rmse => ErrorMetric::Mse.compute(predictions, targets).sqrt(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMetric::Mse => "mse",
            ErrorMetric::Mae => "mae",
            ErrorMetric::Rmse => "rmse",
        }
    }
}

impl FromStr for ErrorMetric {
    type Err = FactorEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mse" => Ok(ErrorMetric::Mse),
            "mae" => Ok(ErrorMetric::Mae),
            "rmse" => Ok(ErrorMetric::Rmse),
            other => Err(FactorEngineError::configuration(
                "model.ensemble.metric",
                format!("unknown metric '{}'. Must be 'mse', 'mae' or 'rmse'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let predictions = [1.0, 2.0, 3.0];
        let targets = [1.0, 4.0, 0.0];

        // errors: 0, -2, 3
        assert!((ErrorMetric::Mse.compute(&predictions, &targets) - 13.0 / 3.0).abs() < 1e-12);
        assert!((ErrorMetric::Mae.compute(&predictions, &targets) - 5.0 / 3.0).abs() < 1e-12);
        assert!(
            (ErrorMetric::Rmse.compute(&predictions, &targets) - (13.0f64 / 3.0).sqrt()).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!("RMSE".parse::<ErrorMetric>().unwrap(), ErrorMetric::Rmse);
        assert!("r2".parse::<ErrorMetric>().is_err());
    }
}
