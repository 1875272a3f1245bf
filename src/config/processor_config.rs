//! Data processor configuration parsed from the property map.

use super::properties::Properties;
use crate::domain::errors::FactorResult;
use tracing::warn;

pub const KEY_TYPE: &str = "processor.type";
pub const KEY_THREADS: &str = "processor.threads";
pub const KEY_BATCH_SIZE: &str = "processor.batchSize";
pub const KEY_THRESHOLD: &str = "processor.threshold";

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_THRESHOLD: usize = 500;

/// Execution strategy selected by `processor.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorType {
    /// Fixed-size batches on a worker pool
    #[default]
    Parallel,
    /// Sequential below `processor.threshold`, parallel above
    Optimized,
    /// Single-threaded, in order
    Single,
}

impl ProcessorType {
    /// Unknown values fall back to `Parallel` with a warning instead of failing
    pub fn from_config_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "parallel" => ProcessorType::Parallel,
            "optimized" => ProcessorType::Optimized,
            "single" => ProcessorType::Single,
            _ => {
                warn!("Unknown processor type: {}. Using parallel processor.", value);
                ProcessorType::Parallel
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorType::Parallel => "parallel",
            ProcessorType::Optimized => "optimized",
            ProcessorType::Single => "single",
        }
    }
}

impl std::fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub processor_type: ProcessorType,
    pub threads: usize,
    pub batch_size: usize,
    pub threshold: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            processor_type: ProcessorType::Parallel,
            threads: host_parallelism(),
            batch_size: DEFAULT_BATCH_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ProcessorConfig {
    pub fn from_properties(props: &Properties) -> FactorResult<Self> {
        let processor_type = props
            .get(KEY_TYPE)
            .map(ProcessorType::from_config_value)
            .unwrap_or_default();

        Ok(Self {
            processor_type,
            threads: props.get_positive(KEY_THREADS, host_parallelism())?,
            batch_size: props.get_positive(KEY_BATCH_SIZE, DEFAULT_BATCH_SIZE)?,
            threshold: props.get_positive(KEY_THRESHOLD, DEFAULT_THRESHOLD)?,
        })
    }
}

/// Number of hardware threads, at least 1
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
