//! Batch submission.
//!
//! ```text
//!   resolve backend ──→ transpile all ──→ partition by cap ──→ submit each
//!   (UnknownBackend)     (one call)        (contiguous)        (in order)
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{Backend, JobLimits};
use crate::error::{DispatchError, DispatchResult, ServiceError};
use crate::job::{JobBatch, JobHandle, partition};
use crate::session::Session;
use crate::timer::{Progress, timed};

/// Resolve `name` against the session's provider.
pub async fn resolve_backend<C>(
    session: &Session<C>,
    name: &str,
) -> DispatchResult<Arc<dyn Backend<C>>> {
    session
        .provider()
        .get_backend(name)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => DispatchError::UnknownBackend(name.to_string()),
            other => DispatchError::Service(other),
        })
}

/// Check `shots` against the backend limits.
pub fn validate_shots(shots: Option<u32>, limits: &JobLimits) -> DispatchResult<()> {
    match shots {
        Some(0) => Err(DispatchError::InvalidShots(
            "shots must be a positive integer".into(),
        )),
        Some(n) if n > limits.max_shots => Err(DispatchError::InvalidShots(format!(
            "{n} exceeds the backend maximum of {}",
            limits.max_shots
        ))),
        _ => Ok(()),
    }
}

/// Adapt `items` to `backend_name` and submit them as one or more jobs.
///
/// Each job carries at most the backend's per-job item cap; the returned
/// batch lists the jobs in input order. With `shots` omitted every job uses
/// the backend default.
pub async fn submit<C>(
    session: &Session<C>,
    items: Vec<C>,
    backend_name: &str,
    shots: Option<u32>,
    progress: &Progress,
) -> DispatchResult<JobBatch>
where
    C: Send + Sync + 'static,
{
    if items.is_empty() {
        return Err(DispatchError::EmptyBatch);
    }

    let backend = resolve_backend(session, backend_name).await?;
    let limits = backend.limits();
    validate_shots(shots, &limits)?;

    let item_count = items.len();
    let adapted = timed(progress, "transpiling...", backend.transpile(&items)).await?;
    if adapted.len() != item_count {
        return Err(ServiceError::Rejected(format!(
            "transpiler returned {} items for {item_count} inputs",
            adapted.len()
        ))
        .into());
    }

    let ranges = partition(item_count, limits.max_items_per_job);
    if ranges.len() > 1 {
        warn!(
            backend = backend_name,
            items = item_count,
            jobs = ranges.len(),
            cap = limits.max_items_per_job,
            "batch split into multiple jobs; only the last one is monitored"
        );
    }

    let batch = timed(progress, "sending job...", async {
        let mut remaining = adapted.into_iter();
        let mut handles = Vec::with_capacity(ranges.len());
        for range in ranges {
            let chunk: Vec<C> = remaining.by_ref().take(range.len()).collect();
            let job = backend.submit(chunk, shots).await?;
            info!(job = %job.id(), items = ?range, "job submitted");
            handles.push(JobHandle::new(job, range));
        }
        Ok::<_, DispatchError>(handles)
    })
    .await?;

    JobBatch::new(backend_name, batch)
        .ok_or_else(|| DispatchError::Service(ServiceError::Rejected("no job was created".into())))
}
