use super::{
    AdaptiveProcessor, DataProcessor, FactorValueTransform, ParallelProcessor, RecordTransform,
    SequentialProcessor,
};
use crate::config::{ProcessorConfig, ProcessorType, Properties};
use crate::domain::errors::FactorResult;
use std::sync::Arc;
use tracing::info;

/// Builds data processors from configuration.
///
/// Stateless: every call returns an independent processor with its own pool.
pub struct ProcessorFactory;

impl ProcessorFactory {
    pub fn create(
        config: &ProcessorConfig,
        transform: Arc<dyn RecordTransform>,
    ) -> FactorResult<Box<dyn DataProcessor>> {
        info!(
            "Creating {} data processor with {} threads",
            config.processor_type, config.threads
        );

        let processor: Box<dyn DataProcessor> = match config.processor_type {
            ProcessorType::Parallel => Box::new(ParallelProcessor::new(
                config.threads,
                config.batch_size,
                transform,
            )?),
            ProcessorType::Optimized => Box::new(AdaptiveProcessor::new(
                config.threads,
                config.batch_size,
                config.threshold,
                transform,
            )?),
            ProcessorType::Single => Box::new(SequentialProcessor::new(transform)),
        };
        Ok(processor)
    }

    pub fn from_properties(
        props: &Properties,
        transform: Arc<dyn RecordTransform>,
    ) -> FactorResult<Box<dyn DataProcessor>> {
        let config = ProcessorConfig::from_properties(props)?;
        Self::create(&config, transform)
    }
}

/// Builds a processor using the default factor-value transform
pub fn create_processor(props: &Properties) -> FactorResult<Box<dyn DataProcessor>> {
    ProcessorFactory::from_properties(props, Arc::new(FactorValueTransform))
}
