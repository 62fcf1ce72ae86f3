//! Error types.
//!
//! Two layers of errors exist:
//!
//! | Type | Raised by | Meaning |
//! |------|-----------|---------|
//! | [`ServiceError`] | remote collaborator ([`Provider`](crate::Provider), [`Backend`](crate::Backend), [`RemoteJob`](crate::RemoteJob)) | what the service reported |
//! | [`DispatchError`] | orchestration | what the caller must act on |
//!
//! Orchestration errors are categorized by how the caller recovers:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Lookup** | `NoBackendsFound`, `NoChoiceMade`, `UnknownBackend` | Pick another backend |
//! | **Auth** | `Authentication` | Follow the remediation text |
//! | **Input** | `EmptyBatch`, `InvalidShots`, `ItemCountMismatch` | Fix input |
//! | **Systemic** | `Service`, `Worker` | None, propagated as-is |
//! | **Local** | `Configuration`, `Io`, `Json` | Fix environment |
//!
//! A single unavailable result is not an error at this layer: the aggregator
//! records it as [`ResultRecord::Unavailable`](crate::ResultRecord::Unavailable).

use thiserror::Error;

/// First remediation step shown on authentication failure.
pub const REGISTER_STEP: &str =
    "Register an account with the quantum service provider and copy your API token.";

/// Second remediation step shown on authentication failure.
pub const SAVE_CREDENTIAL_STEP: &str =
    "Persist the token once per machine (e.g. `dispatch-demo save-account --token <TOKEN>`).";

/// Errors reported by the remote execution service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceError {
    /// The requested entity (backend, job) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend does not expose the requested metadata.
    ///
    /// Simulators report this for detailed device properties.
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// Result data for one item of a job is not available.
    ///
    /// `index` is local to the job that reported it.
    #[error("Result data not available for item {index}")]
    ResultUnavailable {
        /// Index of the item within its job.
        index: usize,
    },

    /// Credentials were rejected or missing.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service refused the submitted work.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The job failed remotely.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// The job was cancelled remotely.
    #[error("Job cancelled: {0}")]
    JobCancelled(String),

    /// Network or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for remote service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the orchestration pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    // ── Lookup errors ────────────────────────────────────────────────
    /// The backend directory was empty after filtering.
    #[error("No active backend was found")]
    NoBackendsFound,

    /// The operator dismissed the backend prompt.
    #[error("You must choose a backend")]
    NoChoiceMade,

    /// The provider does not know the requested backend.
    #[error("No such backend name: {0}")]
    UnknownBackend(String),

    // ── Auth errors ──────────────────────────────────────────────────
    /// Authentication against the service failed.
    #[error(
        "Could not load the quantum service account ({reason}).\n  1. {}\n  2. {}",
        REGISTER_STEP,
        SAVE_CREDENTIAL_STEP
    )]
    Authentication {
        /// What the service reported.
        reason: String,
    },

    // ── Input errors ─────────────────────────────────────────────────
    /// Zero work items were submitted.
    #[error("Cannot submit an empty batch of work items")]
    EmptyBatch,

    /// Shot count is out of range for the backend.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// `collect` was asked for a different item count than the batch covers.
    #[error("Batch covers {actual} items but {expected} were requested")]
    ItemCountMismatch {
        /// Requested item count.
        expected: usize,
        /// Items covered by the batch.
        actual: usize,
    },

    // ── Systemic errors ──────────────────────────────────────────────
    /// Unrecoverable service failure.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A directory worker task died before reporting.
    #[error("Worker task failed: {0}")]
    Worker(String),

    // ── Local errors ─────────────────────────────────────────────────
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// Returns `true` for the LookupError class: selection failures and
    /// unknown backend names.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::NoBackendsFound | Self::NoChoiceMade | Self::UnknownBackend(_)
        )
    }

    /// Wrap a rejected authentication into the actionable error.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }
}

/// Result type for orchestration operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
