use super::{
    CancellationToken, DataProcessor, ParallelProcessor, ProcessorStats, RecordTransform,
    SequentialProcessor,
};
use crate::domain::errors::FactorResult;
use crate::domain::ml::Record;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "optimized";

/// Threshold-based processor.
///
/// Inputs shorter than `threshold` go straight to the sequential path so small
/// workloads never pay for batch dispatch; larger inputs use the parallel path.
/// The crossover depends on workload and hardware, hence configurable.
pub struct AdaptiveProcessor {
    threshold: usize,
    sequential: Box<dyn DataProcessor>,
    parallel: Box<dyn DataProcessor>,
}

impl AdaptiveProcessor {
    pub fn new(
        threads: usize,
        batch_size: usize,
        threshold: usize,
        transform: Arc<dyn RecordTransform>,
    ) -> FactorResult<Self> {
        let parallel = ParallelProcessor::new(threads, batch_size, transform.clone())?;
        Ok(Self::with_processors(
            threshold,
            Box::new(SequentialProcessor::new(transform)),
            Box::new(parallel),
        ))
    }

    /// Builds from explicit inner processors
    pub fn with_processors(
        threshold: usize,
        sequential: Box<dyn DataProcessor>,
        parallel: Box<dyn DataProcessor>,
    ) -> Self {
        Self {
            threshold,
            sequential,
            parallel,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl DataProcessor for AdaptiveProcessor {
    fn process_with_cancel(
        &self,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> FactorResult<Vec<Record>> {
        if records.len() < self.threshold {
            debug!(
                "{} records below threshold {}, processing sequentially",
                records.len(),
                self.threshold
            );
            self.sequential.process_with_cancel(records, cancel)
        } else {
            debug!(
                "{} records at or above threshold {}, processing in parallel",
                records.len(),
                self.threshold
            );
            self.parallel.process_with_cancel(records, cancel)
        }
    }

    fn name(&self) -> &str {
        NAME
    }

    fn stats(&self) -> ProcessorStats {
        self.sequential.stats() + self.parallel.stats()
    }
}
