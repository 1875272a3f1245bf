use super::{
    CancellationToken, DataProcessor, ProcessorMetrics, ProcessorStats, RecordTransform,
    transform_slice, validate_input,
};
use crate::config::{KEY_BATCH_SIZE, KEY_THREADS};
use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::Record;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error};

const NAME: &str = "parallel";

/// Fixed-size batch processor.
///
/// Splits the input into contiguous batches of at most `batch_size` records
/// and runs each batch as its own task on a private pool of exactly `threads`
/// workers. The call blocks until every batch has finished and concatenates
/// results in batch order, so output order matches [`super::SequentialProcessor`]
/// regardless of which worker finishes first.
///
/// Failure is fail-fast: the first worker error aborts the call and results
/// from batches that already completed are dropped.
pub struct ParallelProcessor {
    pool: rayon::ThreadPool,
    threads: usize,
    batch_size: usize,
    transform: Arc<dyn RecordTransform>,
    metrics: ProcessorMetrics,
}

impl ParallelProcessor {
    pub fn new(
        threads: usize,
        batch_size: usize,
        transform: Arc<dyn RecordTransform>,
    ) -> FactorResult<Self> {
        if threads == 0 {
            return Err(FactorEngineError::configuration(
                KEY_THREADS,
                "must be a positive integer",
            ));
        }
        if batch_size == 0 {
            return Err(FactorEngineError::configuration(
                KEY_BATCH_SIZE,
                "must be a positive integer",
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("factor-worker-{}", i))
            .build()
            .map_err(|e| {
                FactorEngineError::configuration(
                    KEY_THREADS,
                    format!("failed to build worker pool: {}", e),
                )
            })?;

        Ok(Self {
            pool,
            threads,
            batch_size,
            transform,
            metrics: ProcessorMetrics::default(),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn run_batch(
        &self,
        index: usize,
        total: usize,
        batch: &[Record],
        cancel: &CancellationToken,
    ) -> FactorResult<Vec<Record>> {
        if cancel.is_cancelled() {
            return Err(FactorEngineError::Cancelled {
                processor: NAME.to_string(),
                completed: 0,
                total,
            });
        }

        let transform = self.transform.as_ref();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            transform_slice(NAME, transform, batch, cancel)
        }))
        .unwrap_or_else(|_| {
            Err(FactorEngineError::Unknown {
                reason: "record transform panicked".to_string(),
            })
        });

        outcome.map_err(|e| match e {
            cancelled @ FactorEngineError::Cancelled { .. } => cancelled,
            other => FactorEngineError::WorkerFailed {
                batch: index,
                total_batches: total,
                source: Box::new(other),
            },
        })
    }
}

impl DataProcessor for ParallelProcessor {
    fn process_with_cancel(
        &self,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> FactorResult<Vec<Record>> {
        validate_input(NAME, records)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<&[Record]> = records.chunks(self.batch_size).collect();
        let total = batches.len();
        self.metrics.record_parallel_run(total, records.len());
        debug!(
            "Dispatching {} records in {} batches to {} workers",
            records.len(),
            total,
            self.threads
        );

        let completed = AtomicUsize::new(0);
        let outcome: FactorResult<Vec<Vec<Record>>> = self.pool.install(|| {
            batches
                .par_iter()
                .with_max_len(1)
                .enumerate()
                .map(|(index, batch)| {
                    let out = self.run_batch(index, total, batch, cancel)?;
                    completed.fetch_add(1, Ordering::Relaxed);
                    Ok(out)
                })
                .collect()
        });

        match outcome {
            Ok(results) => {
                let mut out = Vec::with_capacity(records.len());
                for batch in results {
                    out.extend(batch);
                }
                Ok(out)
            }
            Err(FactorEngineError::Cancelled { .. }) => Err(FactorEngineError::Cancelled {
                processor: NAME.to_string(),
                completed: completed.load(Ordering::Relaxed),
                total,
            }),
            Err(e) => {
                error!("Parallel processing failed: {}", e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        NAME
    }

    fn stats(&self) -> ProcessorStats {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for ParallelProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelProcessor")
            .field("threads", &self.threads)
            .field("batch_size", &self.batch_size)
            .field("stats", &self.metrics.snapshot())
            .finish()
    }
}
