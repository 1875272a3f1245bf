use altfactor::application::models::{
    DEEP_MODEL, ENSEMBLE_MODEL, EnsembleModel, LINEAR_MODEL, LinearRegressionModel, ModelRegistry,
};
use altfactor::config::ModelConfig;
use altfactor::domain::errors::{ErrorKind, FactorEngineError, FactorResult};
use altfactor::domain::ml::{ErrorMetric, FactorModel, Record, SharedModel};
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// --- Fixed-output model ---
struct FixedModel {
    name: String,
    value: f64,
    trained: AtomicBool,
}

impl FixedModel {
    fn shared(name: &str, value: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            value,
            trained: AtomicBool::new(false),
        })
    }
}

impl FactorModel for FixedModel {
    fn train(&self, _records: &[Record], _epochs: usize) -> FactorResult<()> {
        self.trained.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn predict(&self, _features: &[f64]) -> FactorResult<f64> {
        if !self.is_trained() {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        }
        Ok(self.value)
    }

    fn evaluate(&self, records: &[Record]) -> FactorResult<f64> {
        Ok(records
            .iter()
            .map(|r| (self.value - r.target).powi(2))
            .sum::<f64>()
            / records.len().max(1) as f64)
    }

    fn metric(&self) -> ErrorMetric {
        ErrorMetric::Mse
    }

    fn is_trained(&self) -> bool {
        self.trained.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn registry() -> ModelRegistry {
    ModelRegistry::new(ModelConfig {
        feature_count: 3,
        ..ModelConfig::default()
    })
    .unwrap()
}

fn records(n: usize) -> Vec<Record> {
    let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    (0..n)
        .map(|i| Record::new(date, vec![0.1 * i as f64, 1.0, 0.0], 1.0))
        .collect()
}

#[test]
fn test_register_then_get_returns_same_instance() {
    let mut registry = registry();
    let model: SharedModel = FixedModel::shared("x", 1.0);

    assert!(registry.register_model("x", model.clone()).is_none());
    let fetched = registry.get_model("x").unwrap();
    assert!(Arc::ptr_eq(&fetched, &model));
}

#[test]
fn test_second_register_replaces_without_error() {
    let mut registry = registry();
    let m1: SharedModel = FixedModel::shared("x1", 1.0);
    let m2: SharedModel = FixedModel::shared("x2", 2.0);

    registry.register_model("x", m1.clone());
    let displaced = registry.register_model("x", m2.clone());

    assert!(Arc::ptr_eq(&displaced.unwrap(), &m1));
    assert!(Arc::ptr_eq(&registry.get_model("x").unwrap(), &m2));
}

#[test]
fn test_train_missing_model_leaves_registry_untouched() {
    let registry = registry();
    let before = registry.model_names();

    let err = registry.train_model("missing", &records(5), 10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelNotFound);
    assert!(matches!(err, FactorEngineError::ModelNotFound { ref name } if name == "missing"));

    assert_eq!(registry.model_names(), before);
    for name in &before {
        assert!(!registry.get_model(name).unwrap().is_trained());
    }
}

#[test]
fn test_weighted_ensemble_scenario() {
    let mut registry = registry();
    let low = FixedModel::shared("low", 10.0);
    let high = FixedModel::shared("high", 20.0);

    let mut ensemble = EnsembleModel::named("blend");
    ensemble.add_model(low.clone(), 0.3).unwrap();
    ensemble.add_model(high.clone(), 0.7).unwrap();
    registry.register_model("blend", Arc::new(ensemble));

    registry.train_model("blend", &records(3), 1).unwrap();
    assert!(low.is_trained() && high.is_trained());

    let prediction = registry.predict("blend", &[0.0, 0.0, 0.0]).unwrap();
    assert!((prediction - 17.0).abs() < 1e-12);
}

#[test]
fn test_replaced_member_survives_inside_ensemble() {
    let mut registry = registry();
    let original_linear = registry.get_model(LINEAR_MODEL).unwrap();

    let displaced = registry
        .register_model(LINEAR_MODEL, Arc::new(LinearRegressionModel::new(3)))
        .unwrap();
    assert!(Arc::ptr_eq(&displaced, &original_linear));
    drop(displaced);

    // the ensemble still holds the original linear model
    assert!(Arc::strong_count(&original_linear) >= 2);
    let replacement = registry.get_model(LINEAR_MODEL).unwrap();
    assert!(!Arc::ptr_eq(&replacement, &original_linear));
}

#[test]
fn test_default_ensemble_shares_members() {
    let registry = registry();
    let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let data: Vec<Record> = (0..80)
        .map(|i| {
            let a = (i % 9) as f64 / 9.0;
            let b = ((i * 5) % 11) as f64 / 11.0;
            let c = ((i * 7) % 4) as f64 / 4.0;
            Record::new(date, vec![a, b, c], 0.5 * a + 0.3 * b + 0.2 * c)
        })
        .collect();

    registry.train_model(ENSEMBLE_MODEL, &data, 20).unwrap();

    // training the ensemble trains the models registered under their own names
    assert!(registry.get_model(LINEAR_MODEL).unwrap().is_trained());
    assert!(registry.get_model(DEEP_MODEL).unwrap().is_trained());

    let features = [0.5, 0.5, 0.5];
    let linear = registry.predict(LINEAR_MODEL, &features).unwrap();
    let deep = registry.predict(DEEP_MODEL, &features).unwrap();
    let blended = registry.predict(ENSEMBLE_MODEL, &features).unwrap();
    assert!((blended - (0.3 * linear + 0.7 * deep)).abs() < 1e-9);
}

#[test]
fn test_training_error_is_classified_with_cause() {
    let registry = registry();
    let err = registry.train_model(DEEP_MODEL, &[], 5).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelTraining);
    assert!(err.to_string().contains(DEEP_MODEL));
    let source = std::error::Error::source(&err).expect("original cause attached");
    assert!(source.to_string().contains("empty"));
}

#[test]
fn test_predict_untrained_is_prediction_error() {
    let registry = registry();
    let err = registry.predict(LINEAR_MODEL, &[0.0, 0.0, 0.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelPrediction);
}
