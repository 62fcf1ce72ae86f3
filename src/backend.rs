//! Remote execution service interface.
//!
//! The service is an external collaborator. This module defines the narrow
//! surface the orchestration pipeline needs from it:
//!
//! ```text
//!   Authenticator ──→ Provider ──→ Backend ──→ RemoteJob
//!   authenticate()    backends()   status()    status()
//!                     get_backend  properties  queue_position()
//!                                  transpile   counts(index)
//!                                  submit
//! ```
//!
//! ## Design principles
//!
//! - **Async-native**: every round trip is async.
//! - **Thread-safe**: `Send + Sync` bounds so backends can be queried from
//!   parallel worker tasks.
//! - **Item-generic**: traits are parameterized over `C`, the work item type,
//!   so the pipeline never inspects what it submits.
//! - **Infallible limits**: [`Backend::limits`] is synchronous. A backend that
//!   cannot report its submission limits without I/O is not correctly
//!   initialized.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::error::ServiceResult;
use crate::job::{JobId, JobStatus};
use crate::result::Counts;

/// Establishes an authenticated connection to the service.
#[async_trait]
pub trait Authenticator<C>: Send + Sync {
    /// Authenticate and return the provider for this account.
    ///
    /// Fails with [`ServiceError::Authentication`](crate::ServiceError::Authentication)
    /// when credentials are missing or rejected.
    async fn authenticate(&self) -> ServiceResult<Arc<dyn Provider<C>>>;
}

/// Account-level view of the service: the set of backends it exposes.
#[async_trait]
pub trait Provider<C>: Send + Sync {
    /// Provider name (hub/group/project, or a vendor label).
    fn name(&self) -> &str;

    /// Enumerate every backend visible to this account.
    async fn backends(&self) -> ServiceResult<Vec<Arc<dyn Backend<C>>>>;

    /// Resolve one backend by name.
    ///
    /// Fails with [`ServiceError::NotFound`](crate::ServiceError::NotFound)
    /// when the name is unknown.
    async fn get_backend(&self, name: &str) -> ServiceResult<Arc<dyn Backend<C>>>;
}

/// One named execution target.
#[async_trait]
pub trait Backend<C>: Send + Sync {
    /// Backend name. Never contains a line break.
    fn name(&self) -> &str;

    /// Submission limits, cached at construction time.
    fn limits(&self) -> JobLimits;

    /// Live status: current queue depth.
    async fn status(&self) -> ServiceResult<BackendStatus>;

    /// Detailed device properties.
    ///
    /// Simulators fail with
    /// [`ServiceError::MissingAttribute`](crate::ServiceError::MissingAttribute).
    async fn properties(&self) -> ServiceResult<Capabilities>;

    /// Adapt work items to this backend's instruction set and topology.
    ///
    /// Output order and length match the input.
    async fn transpile(&self, items: &[C]) -> ServiceResult<Vec<C>>;

    /// Submit items as one remote job.
    ///
    /// `items.len()` never exceeds [`JobLimits::max_items_per_job`]. With
    /// `shots` omitted the backend uses [`JobLimits::default_shots`].
    async fn submit(&self, items: Vec<C>, shots: Option<u32>)
    -> ServiceResult<Arc<dyn RemoteJob>>;
}

/// Handle to one remote submission.
///
/// The pipeline only observes the job; it never transitions its state.
#[async_trait]
pub trait RemoteJob: Send + Sync {
    /// Remote identifier.
    fn id(&self) -> &JobId;

    /// Current state.
    async fn status(&self) -> ServiceResult<JobStatus>;

    /// Position in the backend queue while queued, if the service reports it.
    async fn queue_position(&self) -> ServiceResult<Option<u32>>;

    /// Histogram for the item at `index` within this job.
    ///
    /// Waits for the job to finish. Fails with
    /// [`ServiceError::ResultUnavailable`](crate::ServiceError::ResultUnavailable)
    /// when this single item has no data; any other error is systemic.
    async fn counts(&self, index: usize) -> ServiceResult<Counts>;
}

/// Per-backend submission limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLimits {
    /// Maximum number of work items one remote job may carry.
    pub max_items_per_job: usize,
    /// Maximum shots per item.
    pub max_shots: u32,
    /// Shots used when the caller does not specify any.
    pub default_shots: u32,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_items_per_job: 100,
            max_shots: 100_000,
            default_shots: 4000,
        }
    }
}

/// Live backend status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Number of jobs waiting in the backend queue.
    pub pending_jobs: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_status_json() {
        let status: BackendStatus = serde_json::from_str(r#"{"pending_jobs": 12}"#).unwrap();
        assert_eq!(status, BackendStatus { pending_jobs: 12 });
    }

    #[test]
    fn test_default_limits() {
        let limits = JobLimits::default();
        assert_eq!(limits.max_items_per_job, 100);
        assert!(limits.default_shots <= limits.max_shots);
    }
}
