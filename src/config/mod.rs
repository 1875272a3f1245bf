//! Configuration module for altfactor.
//!
//! All sources are reduced to a flat [`Properties`] map, then read through
//! typed views for the data processor and the model registry.

mod model_config;
mod processor_config;
mod properties;

pub use model_config::{
    DeepModelConfig, KEY_DEEP_BATCH_SIZE, KEY_DEEP_HIDDEN_SIZE, KEY_DEEP_LEARNING_RATE,
    KEY_DEEP_WEIGHT, KEY_FEATURE_COUNT, KEY_LINEAR_WEIGHT, KEY_METRIC, KEY_SEED, ModelConfig,
};
pub use processor_config::{
    DEFAULT_BATCH_SIZE, DEFAULT_THRESHOLD, KEY_BATCH_SIZE, KEY_THREADS, KEY_THRESHOLD, KEY_TYPE,
    ProcessorConfig, ProcessorType, host_parallelism,
};
pub use properties::Properties;

use crate::domain::errors::FactorResult;
use std::path::Path;

/// Full engine configuration snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub processor: ProcessorConfig,
    pub model: ModelConfig,
}

impl EngineConfig {
    pub fn from_properties(props: &Properties) -> FactorResult<Self> {
        Ok(Self {
            processor: ProcessorConfig::from_properties(props)?,
            model: ModelConfig::from_properties(props)?,
        })
    }
}

/// Loads properties from an optional TOML file, then applies environment overrides
pub fn load_properties(path: Option<&Path>) -> FactorResult<Properties> {
    let base = match path {
        Some(path) => Properties::from_toml_file(path)?,
        None => Properties::new(),
    };
    Ok(base.with_env_overrides())
}
