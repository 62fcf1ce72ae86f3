//! Result aggregation.
//!
//! Walks every item of a batch in input order and fetches its histogram.
//! An item the service reports as unavailable becomes
//! [`ResultRecord::Unavailable`] plus a warning naming its index; any other
//! failure aborts the collection.

use tracing::warn;

use crate::error::{DispatchError, DispatchResult, ServiceError};
use crate::job::JobBatch;
use crate::result::ResultRecord;

/// Fetch one record per item, `item_count` records in total.
///
/// `item_count` must equal [`JobBatch::item_count`].
pub async fn collect(batch: &JobBatch, item_count: usize) -> DispatchResult<Vec<ResultRecord>> {
    if item_count != batch.item_count() {
        return Err(DispatchError::ItemCountMismatch {
            expected: item_count,
            actual: batch.item_count(),
        });
    }

    let mut records = Vec::with_capacity(item_count);
    for handle in batch.handles() {
        let job = handle.job();
        for (local, index) in handle.range().enumerate() {
            match job.counts(local).await {
                Ok(counts) => records.push(ResultRecord::Histogram(counts)),
                Err(ServiceError::ResultUnavailable { .. }) => {
                    warn!(
                        index,
                        job = %handle.id(),
                        "result for item {index} is not available, recording it as unavailable"
                    );
                    records.push(ResultRecord::Unavailable);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    debug_assert_eq!(records.len(), item_count);
    Ok(records)
}
