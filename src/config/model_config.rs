//! Model registry configuration parsed from the property map.

use super::properties::Properties;
use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::ErrorMetric;

pub const KEY_FEATURE_COUNT: &str = "model.feature.count";
pub const KEY_SEED: &str = "model.seed";
pub const KEY_DEEP_HIDDEN_SIZE: &str = "model.deep.hiddenSize";
pub const KEY_DEEP_LEARNING_RATE: &str = "model.deep.learningRate";
pub const KEY_DEEP_BATCH_SIZE: &str = "model.deep.batchSize";
pub const KEY_LINEAR_WEIGHT: &str = "model.ensemble.linearWeight";
pub const KEY_DEEP_WEIGHT: &str = "model.ensemble.deepWeight";
pub const KEY_METRIC: &str = "model.ensemble.metric";

/// Hyper-parameters of the deep factor model
#[derive(Debug, Clone, PartialEq)]
pub struct DeepModelConfig {
    pub hidden_size: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for DeepModelConfig {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            learning_rate: 0.001,
            batch_size: 16,
            seed: 123,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub feature_count: usize,
    pub deep: DeepModelConfig,
    pub linear_weight: f64,
    pub deep_weight: f64,
    pub metric: ErrorMetric,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            feature_count: 10,
            deep: DeepModelConfig::default(),
            linear_weight: 0.3,
            deep_weight: 0.7,
            metric: ErrorMetric::Mse,
        }
    }
}

impl ModelConfig {
    pub fn from_properties(props: &Properties) -> FactorResult<Self> {
        let defaults = Self::default();

        let learning_rate = props.get_parsed(KEY_DEEP_LEARNING_RATE, defaults.deep.learning_rate)?;
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(FactorEngineError::configuration(
                KEY_DEEP_LEARNING_RATE,
                "must be a positive number",
            ));
        }

        let metric = match props.get(KEY_METRIC) {
            Some(raw) => raw.parse::<ErrorMetric>()?,
            None => defaults.metric,
        };

        Ok(Self {
            feature_count: props.get_positive(KEY_FEATURE_COUNT, defaults.feature_count)?,
            deep: DeepModelConfig {
                hidden_size: props.get_positive(KEY_DEEP_HIDDEN_SIZE, defaults.deep.hidden_size)?,
                learning_rate,
                batch_size: props.get_positive(KEY_DEEP_BATCH_SIZE, defaults.deep.batch_size)?,
                seed: props.get_parsed(KEY_SEED, defaults.deep.seed)?,
            },
            linear_weight: parse_weight(props, KEY_LINEAR_WEIGHT, defaults.linear_weight)?,
            deep_weight: parse_weight(props, KEY_DEEP_WEIGHT, defaults.deep_weight)?,
            metric,
        })
    }
}

fn parse_weight(props: &Properties, key: &str, default: f64) -> FactorResult<f64> {
    let weight = props.get_parsed(key, default)?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(FactorEngineError::configuration(
            key,
            format!("weight {} must be finite and non-negative", weight),
        ));
    }
    Ok(weight)
}
