use super::{
    CancellationToken, DataProcessor, FactorValueTransform, ProcessorMetrics, ProcessorStats,
    RecordTransform, transform_slice, validate_input,
};
use crate::domain::errors::FactorResult;
use crate::domain::ml::Record;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "single";

/// Processes records one at a time, in input order, on the calling thread
pub struct SequentialProcessor {
    transform: Arc<dyn RecordTransform>,
    metrics: ProcessorMetrics,
}

impl SequentialProcessor {
    pub fn new(transform: Arc<dyn RecordTransform>) -> Self {
        Self {
            transform,
            metrics: ProcessorMetrics::default(),
        }
    }
}

impl Default for SequentialProcessor {
    fn default() -> Self {
        Self::new(Arc::new(FactorValueTransform))
    }
}

impl DataProcessor for SequentialProcessor {
    fn process_with_cancel(
        &self,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> FactorResult<Vec<Record>> {
        validate_input(NAME, records)?;
        self.metrics.record_sequential_run(records.len());
        debug!("Sequential processing of {} records", records.len());

        transform_slice(NAME, self.transform.as_ref(), records, cancel)
    }

    fn name(&self) -> &str {
        NAME
    }

    fn stats(&self) -> ProcessorStats {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for SequentialProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialProcessor")
            .field("stats", &self.metrics.snapshot())
            .finish()
    }
}
