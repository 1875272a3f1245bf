use super::{DeepFactorModel, EnsembleModel, LinearRegressionModel};
use crate::config::ModelConfig;
use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::{Record, SharedModel};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const LINEAR_MODEL: &str = "linear";
pub const DEEP_MODEL: &str = "deeplearning";
pub const ENSEMBLE_MODEL: &str = "ensemble";

/// Named collection of factor models.
///
/// Lookups hand out shared handles; the same model may sit under several
/// names and inside ensembles. Mutation goes through `&mut self`, so a
/// registry shared across threads has to be wrapped in a lock by its owner.
pub struct ModelRegistry {
    models: HashMap<String, SharedModel>,
    config: ModelConfig,
}

impl ModelRegistry {
    /// Creates the registry with the default models:
    /// `linear`, `deeplearning` and an `ensemble` of the two.
    pub fn new(config: ModelConfig) -> FactorResult<Self> {
        let mut registry = Self::empty(config);
        registry.initialize_default_models()?;
        Ok(registry)
    }

    /// A registry with no models registered
    pub fn empty(config: ModelConfig) -> Self {
        Self {
            models: HashMap::new(),
            config,
        }
    }

    fn initialize_default_models(&mut self) -> FactorResult<()> {
        let feature_count = self.config.feature_count;

        let metric = self.config.metric;

        let linear: SharedModel =
            Arc::new(LinearRegressionModel::named(LINEAR_MODEL, feature_count).with_metric(metric));
        let deep: SharedModel = Arc::new(
            DeepFactorModel::with_config(DEEP_MODEL, feature_count, self.config.deep.clone())
                .with_metric(metric),
        );

        let mut ensemble = EnsembleModel::named(ENSEMBLE_MODEL).with_metric(metric);
        ensemble.add_model(linear.clone(), self.config.linear_weight)?;
        ensemble.add_model(deep.clone(), self.config.deep_weight)?;

        self.models.insert(LINEAR_MODEL.to_string(), linear);
        self.models.insert(DEEP_MODEL.to_string(), deep);
        self.models
            .insert(ENSEMBLE_MODEL.to_string(), Arc::new(ensemble));

        info!("Default models initialized: {:?}", self.model_names());
        Ok(())
    }

    /// Trains the named model.
    ///
    /// Any failure from the model is wrapped with the model name so callers
    /// always get a classified training error.
    pub fn train_model(&self, name: &str, records: &[Record], epochs: usize) -> FactorResult<()> {
        let model = self.get_model(name)?;

        match model.train(records, epochs) {
            Ok(()) => {
                info!("Model {} trained successfully", name);
                Ok(())
            }
            Err(e) => {
                error!("Failed to train model {}: {}", name, e);
                Err(FactorEngineError::TrainingFailed {
                    model: name.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    pub fn get_model(&self, name: &str) -> FactorResult<SharedModel> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| FactorEngineError::model_not_found(name))
    }

    pub fn predict(&self, name: &str, features: &[f64]) -> FactorResult<f64> {
        self.get_model(name)?.predict(features)
    }

    pub fn evaluate(&self, name: &str, records: &[Record]) -> FactorResult<f64> {
        self.get_model(name)?.evaluate(records)
    }

    /// Inserts or replaces a model. Replacing logs a warning and returns the
    /// displaced model, which stays alive while other handles to it exist.
    pub fn register_model(&mut self, name: impl Into<String>, model: SharedModel) -> Option<SharedModel> {
        let name = name.into();
        let previous = self.models.insert(name.clone(), model);
        if previous.is_some() {
            warn!("Overriding existing model: {}", name);
        }
        info!("Model registered: {}", name);
        previous
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered names, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.model_names())
            .field("feature_count", &self.config.feature_count)
            .finish()
    }
}
