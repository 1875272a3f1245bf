use crate::application::models::ModelRegistry;
use crate::application::processing::{
    DataProcessor, FactorValueTransform, ProcessorFactory, ProcessorStats, process_with_timeout,
};
use crate::config::{EngineConfig, Properties};
use crate::domain::errors::FactorResult;
use crate::domain::ml::Record;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Outcome of one training run, handed to reporting collaborators
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub model: String,
    pub processor: String,
    pub samples: usize,
    pub epochs: usize,
    pub metric: String,
    pub score: f64,
    pub processor_stats: ProcessorStats,
}

/// Owns the data processor and the model registry built from one configuration snapshot
pub struct FactorEngine {
    config: EngineConfig,
    processor: Arc<dyn DataProcessor>,
    registry: ModelRegistry,
}

impl FactorEngine {
    pub fn from_properties(props: &Properties) -> FactorResult<Self> {
        Self::new(EngineConfig::from_properties(props)?)
    }

    pub fn new(config: EngineConfig) -> FactorResult<Self> {
        let processor: Arc<dyn DataProcessor> =
            ProcessorFactory::create(&config.processor, Arc::new(FactorValueTransform))?.into();
        let registry = ModelRegistry::new(config.model.clone())?;
        info!(
            "FactorEngine initialized: processor={}, models={:?}",
            processor.name(),
            registry.model_names()
        );

        Ok(Self {
            config,
            processor,
            registry,
        })
    }

    pub fn preprocess(&self, records: &[Record]) -> FactorResult<Vec<Record>> {
        self.processor.process(records)
    }

    /// Preprocesses with a wall-time limit; exceeding it cancels the batches
    pub async fn preprocess_with_timeout(
        &self,
        records: Vec<Record>,
        limit: Duration,
    ) -> FactorResult<Vec<Record>> {
        process_with_timeout(self.processor.clone(), records, limit).await
    }

    /// Trains `name` on already preprocessed records and scores it in-sample
    pub fn train_preprocessed(
        &self,
        name: &str,
        records: &[Record],
        epochs: usize,
    ) -> FactorResult<TrainingReport> {
        let model = self.registry.get_model(name)?;
        self.registry.train_model(name, records, epochs)?;
        let score = model.evaluate(records)?;

        Ok(TrainingReport {
            model: name.to_string(),
            processor: self.processor.name().to_string(),
            samples: records.len(),
            epochs,
            metric: model.metric().as_str().to_string(),
            score,
            processor_stats: self.processor.stats(),
        })
    }

    /// Preprocesses `records` then trains `name` on the result
    pub fn train_model(
        &self,
        name: &str,
        records: &[Record],
        epochs: usize,
    ) -> FactorResult<TrainingReport> {
        // Fail on unknown names before spending time on preprocessing
        self.registry.get_model(name)?;
        let processed = self.preprocess(records)?;
        self.train_preprocessed(name, &processed, epochs)
    }

    pub fn predict(&self, name: &str, features: &[f64]) -> FactorResult<f64> {
        self.registry.predict(name, features)
    }

    pub fn evaluate(&self, name: &str, records: &[Record]) -> FactorResult<f64> {
        self.registry.evaluate(name, records)
    }

    pub fn processor(&self) -> &dyn DataProcessor {
        self.processor.as_ref()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
