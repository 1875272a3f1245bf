use super::{CancellationToken, DataProcessor};
use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::Record;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Runs `processor` on the blocking pool with an upper bound on wall time.
///
/// When `limit` elapses the processor is cancelled cooperatively and this
/// waits for its workers to stop before failing with a cancellation error.
pub async fn process_with_timeout(
    processor: Arc<dyn DataProcessor>,
    records: Vec<Record>,
    limit: Duration,
) -> FactorResult<Vec<Record>> {
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let name = processor.name().to_string();

    let mut handle = tokio::task::spawn_blocking(move || {
        processor.process_with_cancel(&records, &worker_cancel)
    });

    match tokio::time::timeout(limit, &mut handle).await {
        Ok(joined) => joined.map_err(|e| FactorEngineError::Unknown {
            reason: format!("processing task for '{}' failed: {}", name, e),
        })?,
        Err(_) => {
            warn!("Processor '{}' exceeded {:?}, cancelling", name, limit);
            cancel.cancel();

            match handle.await {
                Ok(Err(cancelled @ FactorEngineError::Cancelled { .. })) => Err(cancelled),
                _ => Err(FactorEngineError::Cancelled {
                    processor: name,
                    completed: 0,
                    total: 0,
                }),
            }
        }
    }
}
