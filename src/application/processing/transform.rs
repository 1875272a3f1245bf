use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::Record;

/// Pure per-record transformation applied by every data processor.
///
/// Implementations must not depend on other records or on call order, so
/// batches can run on any worker.
pub trait RecordTransform: Send + Sync {
    fn apply(&self, record: &Record) -> FactorResult<Record>;
}

impl<F> RecordTransform for F
where
    F: Fn(&Record) -> FactorResult<Record> + Send + Sync,
{
    fn apply(&self, record: &Record) -> FactorResult<Record> {
        self(record)
    }
}

/// Copies records unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl RecordTransform for IdentityTransform {
    fn apply(&self, record: &Record) -> FactorResult<Record> {
        Ok(record.clone())
    }
}

/// Equal-weighted composite factor: the mean of the feature vector.
///
/// Records with non-finite features are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactorValueTransform;

impl RecordTransform for FactorValueTransform {
    fn apply(&self, record: &Record) -> FactorResult<Record> {
        if let Some(pos) = record.features.iter().position(|v| !v.is_finite()) {
            return Err(FactorEngineError::TransformFailed {
                date: record.date,
                reason: format!("feature {} is not finite", pos),
            });
        }

        let factor_value = if record.features.is_empty() {
            0.0
        } else {
            record.features.iter().sum::<f64>() / record.features.len() as f64
        };

        Ok(record.clone().with_factor_value(factor_value))
    }
}
