//! Data processing strategies.
//!
//! Three interchangeable [`DataProcessor`] implementations share one contract:
//! order-preserving, returning a new sequence, never mutating the input.
//! - [`SequentialProcessor`]: in order on the calling thread (the reference)
//! - [`ParallelProcessor`]: contiguous batches on a private worker pool
//! - [`AdaptiveProcessor`]: sequential below a size threshold, parallel above

mod adaptive;
mod cancellation;
mod factory;
mod parallel;
mod sequential;
mod timeout;
mod transform;

pub use adaptive::AdaptiveProcessor;
pub use cancellation::CancellationToken;
pub use factory::{ProcessorFactory, create_processor};
pub use parallel::ParallelProcessor;
pub use sequential::SequentialProcessor;
pub use timeout::process_with_timeout;
pub use transform::{FactorValueTransform, IdentityTransform, RecordTransform};

use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::Record;
use serde::Serialize;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait DataProcessor: Send + Sync {
    fn process(&self, records: &[Record]) -> FactorResult<Vec<Record>> {
        self.process_with_cancel(records, &CancellationToken::new())
    }

    /// Same as [`DataProcessor::process`], stopping early once `cancel` is set.
    /// A cancelled call fails; it never returns partial output.
    fn process_with_cancel(
        &self,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> FactorResult<Vec<Record>>;

    fn name(&self) -> &str;

    fn stats(&self) -> ProcessorStats;
}

/// Snapshot of how a processor has executed so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub sequential_runs: u64,
    pub parallel_runs: u64,
    pub batches_dispatched: u64,
    pub records_processed: u64,
}

impl Add for ProcessorStats {
    type Output = ProcessorStats;

    fn add(self, rhs: Self) -> Self::Output {
        ProcessorStats {
            sequential_runs: self.sequential_runs + rhs.sequential_runs,
            parallel_runs: self.parallel_runs + rhs.parallel_runs,
            batches_dispatched: self.batches_dispatched + rhs.batches_dispatched,
            records_processed: self.records_processed + rhs.records_processed,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ProcessorMetrics {
    sequential_runs: AtomicU64,
    parallel_runs: AtomicU64,
    batches_dispatched: AtomicU64,
    records_processed: AtomicU64,
}

impl ProcessorMetrics {
    pub(crate) fn record_sequential_run(&self, records: usize) {
        self.sequential_runs.fetch_add(1, Ordering::Relaxed);
        self.records_processed
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_parallel_run(&self, batches: usize, records: usize) {
        self.parallel_runs.fetch_add(1, Ordering::Relaxed);
        self.batches_dispatched
            .fetch_add(batches as u64, Ordering::Relaxed);
        self.records_processed
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ProcessorStats {
        ProcessorStats {
            sequential_runs: self.sequential_runs.load(Ordering::Relaxed),
            parallel_runs: self.parallel_runs.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            records_processed: self.records_processed.load(Ordering::Relaxed),
        }
    }
}

/// All records in one call must share the feature-vector length of the first
pub(crate) fn validate_input(processor: &str, records: &[Record]) -> FactorResult<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let expected = first.feature_count();

    if let Some((index, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| r.feature_count() != expected)
    {
        return Err(FactorEngineError::InvalidInput {
            processor: processor.to_string(),
            reason: format!(
                "record {} ({}) has {} features, expected {}",
                index,
                record.date,
                record.feature_count(),
                expected
            ),
        });
    }
    Ok(())
}

/// Applies `transform` to each record in order, checking `cancel` between records.
/// Cancellation reports how many records were transformed.
pub(crate) fn transform_slice(
    processor: &str,
    transform: &dyn RecordTransform,
    records: &[Record],
    cancel: &CancellationToken,
) -> FactorResult<Vec<Record>> {
    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(FactorEngineError::Cancelled {
                processor: processor.to_string(),
                completed: index,
                total: records.len(),
            });
        }
        out.push(transform.apply(record)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use chrono::NaiveDate;

    #[test]
    fn test_validate_input_rejects_ragged_features() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = vec![
            Record::new(date, vec![1.0, 2.0], 0.0),
            Record::new(date, vec![1.0], 0.0),
        ];
        let err = validate_input("single", &records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataProcessing);
        assert!(err.to_string().contains("record 1"));

        assert!(validate_input("single", &[]).is_ok());
    }

    #[test]
    fn test_stats_add() {
        let a = ProcessorStats {
            sequential_runs: 1,
            records_processed: 10,
            ..Default::default()
        };
        let b = ProcessorStats {
            parallel_runs: 1,
            batches_dispatched: 3,
            records_processed: 600,
            ..Default::default()
        };
        let sum = a + b;
        assert_eq!(sum.sequential_runs, 1);
        assert_eq!(sum.parallel_runs, 1);
        assert_eq!(sum.batches_dispatched, 3);
        assert_eq!(sum.records_processed, 610);
    }
}
