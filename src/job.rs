//! Job lifecycle and batch types.
//!
//! The remote job state machine, observed only by polling:
//!
//! ```text
//!   submit() ──→ Queued ──→ Running ──→ Completed
//!                  │           │
//!                  │           ├──→ Failed(reason)
//!                  │           │
//!                  └───────────┴──→ Cancelled
//! ```
//!
//! A [`JobBatch`] is the ordered set of jobs produced from one submission.
//! Concatenating the ranges of its handles, in order, yields `0..item_count`
//! exactly once.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::RemoteJob;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is waiting in queue.
    Queued,
    /// Job is currently running.
    Running,
    /// Job completed successfully.
    Completed,
    /// Job failed with an error message.
    Failed(String),
    /// Job was cancelled.
    Cancelled,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed(_) | JobStatus::Cancelled
        )
    }

    /// Check if the job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed(msg) => write!(f, "Failed: {msg}"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One remote submission and the contiguous slice of work items it covers.
#[derive(Clone)]
pub struct JobHandle {
    job: Arc<dyn RemoteJob>,
    range: Range<usize>,
}

impl JobHandle {
    /// Pair a remote job with the input range it was submitted for.
    pub fn new(job: Arc<dyn RemoteJob>, range: Range<usize>) -> Self {
        Self { job, range }
    }

    /// The remote job.
    pub fn job(&self) -> &dyn RemoteJob {
        self.job.as_ref()
    }

    /// Remote identifier.
    pub fn id(&self) -> &JobId {
        self.job.id()
    }

    /// Input positions covered by this job.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Number of items in this job.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether this job covers no items.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", self.id())
            .field("range", &self.range)
            .finish()
    }
}

/// Ordered jobs produced by splitting one work-item sequence.
#[derive(Debug, Clone)]
pub struct JobBatch {
    backend: String,
    handles: Vec<JobHandle>,
}

impl JobBatch {
    /// Build a batch from handles in submission order.
    ///
    /// Returns `None` if the handles are empty or their ranges are not
    /// contiguous from zero.
    pub fn new(backend: impl Into<String>, handles: Vec<JobHandle>) -> Option<Self> {
        if handles.is_empty() {
            return None;
        }
        let mut next = 0;
        for handle in &handles {
            if handle.range.start != next || handle.is_empty() {
                return None;
            }
            next = handle.range.end;
        }
        Some(Self {
            backend: backend.into(),
            handles,
        })
    }

    /// Name of the backend the batch was submitted to.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Handles in submission order.
    pub fn handles(&self) -> &[JobHandle] {
        &self.handles
    }

    /// Number of remote jobs the input was split into.
    pub fn job_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of work items covered.
    pub fn item_count(&self) -> usize {
        self.handles.last().map_or(0, |h| h.range.end)
    }

    /// The most recently submitted job. This is the only one monitored live.
    pub fn last(&self) -> &JobHandle {
        // `new` rejects empty handle lists.
        &self.handles[self.handles.len() - 1]
    }
}

/// Split `len` items into contiguous ranges of at most `cap` items.
///
/// A `cap` of zero is treated as one.
pub fn partition(len: usize, cap: usize) -> Vec<Range<usize>> {
    let cap = cap.max(1);
    (0..len)
        .step_by(cap)
        .map(|start| start..(start + cap).min(len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryJob;

    fn handle(id: &str, range: Range<usize>) -> JobHandle {
        JobHandle::new(Arc::new(MemoryJob::completed(id)), range)
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed("error".into()).is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Queued.to_string(), "Queued");
        assert_eq!(
            JobStatus::Failed("timeout".into()).to_string(),
            "Failed: timeout"
        );
    }

    #[test]
    fn test_partition_uneven() {
        assert_eq!(partition(250, 100), vec![0..100, 100..200, 200..250]);
    }

    #[test]
    fn test_partition_edges() {
        assert_eq!(partition(100, 100), vec![0..100]);
        assert_eq!(partition(3, 0), vec![0..1, 1..2, 2..3]);
        assert!(partition(0, 10).is_empty());
    }

    #[test]
    fn test_batch_rejects_gaps_and_empty() {
        assert!(JobBatch::new("b", vec![]).is_none());
        assert!(JobBatch::new("b", vec![handle("a", 0..5), handle("b", 6..9)]).is_none());
        assert!(JobBatch::new("b", vec![handle("a", 1..5)]).is_none());
    }

    #[test]
    fn test_batch_accessors() {
        let batch = JobBatch::new(
            "ibm_test",
            vec![handle("a", 0..100), handle("b", 100..200), handle("c", 200..250)],
        )
        .unwrap();

        assert_eq!(batch.job_count(), 3);
        assert_eq!(batch.item_count(), 250);
        assert_eq!(batch.last().id().0, "c");
    }
}
