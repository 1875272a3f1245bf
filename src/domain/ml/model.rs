use super::metrics::ErrorMetric;
use super::record::Record;
use crate::domain::errors::{FactorEngineError, FactorResult};
use std::sync::Arc;

/// Interface for predictive factor models.
///
/// Models are shared between registry names and ensembles, so training goes
/// through `&self` and implementations keep their fitted state behind a lock.
pub trait FactorModel: Send + Sync {
    /// Fit the model. A successful call leaves the model trained for good.
    fn train(&self, records: &[Record], epochs: usize) -> FactorResult<()>;

    /// Predict the target for one feature vector
    fn predict(&self, features: &[f64]) -> FactorResult<f64>;

    /// Error metric of the model's predictions against record targets
    fn evaluate(&self, records: &[Record]) -> FactorResult<f64>;

    /// Metric used by [`FactorModel::evaluate`]
    fn metric(&self) -> ErrorMetric;

    fn is_trained(&self) -> bool;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Shared handle to a model, as held by the registry and ensembles
pub type SharedModel = Arc<dyn FactorModel>;

/// Rejects feature vectors whose length differs from the model input size
pub fn check_feature_size(model: &str, expected: usize, features: &[f64]) -> FactorResult<()> {
    if features.len() != expected {
        return Err(FactorEngineError::FeatureSizeMismatch {
            model: model.to_string(),
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Validates a training set: non-empty and every record matching the input size
pub fn check_training_set(model: &str, input_size: usize, records: &[Record]) -> FactorResult<()> {
    if records.is_empty() {
        return Err(FactorEngineError::InvalidTrainingData {
            model: model.to_string(),
            reason: "training data cannot be empty".to_string(),
        });
    }
    for record in records {
        check_feature_size(model, input_size, &record.features)?;
        if !record.target.is_finite() || record.features.iter().any(|v| !v.is_finite()) {
            return Err(FactorEngineError::InvalidTrainingData {
                model: model.to_string(),
                reason: format!("non-finite value in record dated {}", record.date),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use chrono::NaiveDate;

    #[test]
    fn test_feature_size_check() {
        assert!(check_feature_size("m", 3, &[1.0, 2.0, 3.0]).is_ok());
        let err = check_feature_size("m", 3, &[1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelPrediction);
    }

    #[test]
    fn test_training_set_rejects_empty_and_nan() {
        assert!(check_training_set("m", 2, &[]).is_err());

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bad = vec![Record::new(date, vec![1.0, f64::NAN], 0.0)];
        let err = check_training_set("m", 2, &bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelTraining);
    }
}
