use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::model::{check_feature_size, check_training_set};
use crate::domain::ml::{ErrorMetric, FactorModel, Record};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::sync::RwLock;
use tracing::info;

type Regressor = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Ordinary least squares baseline backed by SmartCore.
///
/// The fit is closed-form, so `epochs` is accepted but unused.
pub struct LinearRegressionModel {
    name: String,
    input_size: usize,
    metric: ErrorMetric,
    model: RwLock<Option<Regressor>>,
}

impl LinearRegressionModel {
    pub fn new(input_size: usize) -> Self {
        Self::named("linear", input_size)
    }

    pub fn named(name: impl Into<String>, input_size: usize) -> Self {
        Self {
            name: name.into(),
            input_size,
            metric: ErrorMetric::Mse,
            model: RwLock::new(None),
        }
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    fn to_matrix(&self, rows: Vec<Vec<f64>>) -> FactorResult<DenseMatrix<f64>> {
        DenseMatrix::from_2d_vec(&rows).map_err(|e| FactorEngineError::PredictionFailed {
            model: self.name.clone(),
            reason: format!("matrix creation failed: {}", e),
        })
    }

    fn predict_rows(&self, rows: Vec<Vec<f64>>) -> FactorResult<Vec<f64>> {
        let guard = self
            .model
            .read()
            .map_err(|_| FactorEngineError::poisoned("linear model"))?;
        let Some(model) = guard.as_ref() else {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        };

        let matrix = self.to_matrix(rows)?;
        model
            .predict(&matrix)
            .map_err(|e| FactorEngineError::PredictionFailed {
                model: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

impl FactorModel for LinearRegressionModel {
    fn train(&self, records: &[Record], _epochs: usize) -> FactorResult<()> {
        check_training_set(&self.name, self.input_size, records)?;
        info!(
            "Training {} with {} samples",
            self.name,
            records.len()
        );

        let rows: Vec<Vec<f64>> = records.iter().map(|r| r.features.clone()).collect();
        let targets: Vec<f64> = records.iter().map(|r| r.target).collect();
        let matrix = DenseMatrix::from_2d_vec(&rows).map_err(|e| {
            FactorEngineError::InvalidTrainingData {
                model: self.name.clone(),
                reason: format!("matrix creation failed: {}", e),
            }
        })?;

        let parameters =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let fitted = LinearRegression::fit(&matrix, &targets, parameters).map_err(|e| {
            FactorEngineError::InvalidTrainingData {
                model: self.name.clone(),
                reason: format!("least squares fit failed: {}", e),
            }
        })?;

        *self
            .model
            .write()
            .map_err(|_| FactorEngineError::poisoned("linear model"))? = Some(fitted);

        let score = self.evaluate(records)?;
        info!(
            "{} training completed. In-sample {}: {:.6}",
            self.name,
            self.metric.as_str(),
            score
        );
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> FactorResult<f64> {
        if !self.is_trained() {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        }
        check_feature_size(&self.name, self.input_size, features)?;

        let predictions = self.predict_rows(vec![features.to_vec()])?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| FactorEngineError::PredictionFailed {
                model: self.name.clone(),
                reason: "no prediction returned".to_string(),
            })
    }

    fn evaluate(&self, records: &[Record]) -> FactorResult<f64> {
        if !self.is_trained() {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        }
        if records.is_empty() {
            return Err(FactorEngineError::EmptyEvaluationSet {
                model: self.name.clone(),
            });
        }
        for record in records {
            check_feature_size(&self.name, self.input_size, &record.features)?;
        }

        let rows: Vec<Vec<f64>> = records.iter().map(|r| r.features.clone()).collect();
        let targets: Vec<f64> = records.iter().map(|r| r.target).collect();
        let predictions = self.predict_rows(rows)?;
        Ok(self.metric.compute(&predictions, &targets))
    }

    fn metric(&self) -> ErrorMetric {
        self.metric
    }

    fn is_trained(&self) -> bool {
        self.model.read().map(|m| m.is_some()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use chrono::{Duration, NaiveDate};

    fn linear_records(n: usize) -> Vec<Record> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        (0..n)
            .map(|i| {
                let x1 = (i % 10) as f64 / 10.0;
                let x2 = ((i * 7) % 13) as f64 / 13.0;
                let x3 = ((i * 3) % 11) as f64 / 11.0;
                let target = 0.5 * x1 + 0.3 * x2 - 0.2 * x3 + 0.1;
                Record::new(start + Duration::days(i as i64), vec![x1, x2, x3], target)
            })
            .collect()
    }

    #[test]
    fn test_recovers_linear_relationship() {
        let model = LinearRegressionModel::new(3);
        let data = linear_records(60);
        model.train(&data, 1).unwrap();

        assert!(model.is_trained());
        let prediction = model.predict(&[0.5, 0.5, 0.5]).unwrap();
        assert!((prediction - 0.4).abs() < 1e-6, "got {}", prediction);
        assert!(model.evaluate(&data).unwrap() < 1e-10);
    }

    #[test]
    fn test_predict_before_training() {
        let model = LinearRegressionModel::new(3);
        let err = model.predict(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FactorEngineError::NotTrained { .. }));
        assert_eq!(err.kind(), ErrorKind::ModelPrediction);
    }

    #[test]
    fn test_feature_mismatch_on_train_and_predict() {
        let model = LinearRegressionModel::new(4);
        let err = model.train(&linear_records(20), 1).unwrap_err();
        assert!(matches!(err, FactorEngineError::FeatureSizeMismatch { .. }));

        let model = LinearRegressionModel::new(3);
        model.train(&linear_records(20), 1).unwrap();
        let err = model.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            FactorEngineError::FeatureSizeMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }
}
