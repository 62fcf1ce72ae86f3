//! Backend directory: live, parallel discovery of execution targets.
//!
//! Each backend needs two independent round trips (status and properties).
//! They run concurrently per backend, and backends are queried in parallel
//! on a worker pool bounded by a [`Semaphore`]. The call returns only once
//! every worker finished; any worker failure fails the whole listing.
//!
//! Descriptors are rebuilt on every call since queue depth is volatile.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{DispatchError, DispatchResult, ServiceError};
use crate::session::Session;

/// Capability summary of a backend without detailed properties.
pub const SIMULATED_MARKER: &str = "simulated qubits";

/// One row of the backend directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Backend name, unique within the directory.
    pub name: String,
    /// Jobs waiting in the backend queue.
    pub pending_jobs: u32,
    /// `"<n> qubits"` optionally followed by a line of sorted tags, or
    /// [`SIMULATED_MARKER`].
    pub capability_summary: String,
}

impl BackendDescriptor {
    /// Descriptor for a hardware backend.
    pub fn hardware(
        name: impl Into<String>,
        pending_jobs: u32,
        num_qubits: u32,
        tags: &[String],
    ) -> Self {
        let tags = sort_tags(tags);
        let capability_summary = if tags.is_empty() {
            format!("{num_qubits} qubits")
        } else {
            format!("{num_qubits} qubits\n{}", tags.join(", "))
        };
        Self {
            name: name.into(),
            pending_jobs,
            capability_summary,
        }
    }

    /// Descriptor for a backend without detailed properties.
    pub fn simulated(name: impl Into<String>, pending_jobs: u32) -> Self {
        Self {
            name: name.into(),
            pending_jobs,
            capability_summary: SIMULATED_MARKER.to_string(),
        }
    }

    /// Whether the capability summary ends with [`SIMULATED_MARKER`].
    pub fn is_simulated(&self) -> bool {
        self.capability_summary.ends_with(SIMULATED_MARKER)
    }

    /// Multi-line text shown to the operator. The first line is the name.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{} queued\n{}",
            self.name, self.pending_jobs, self.capability_summary
        )
    }
}

/// Sort tags lexicographically, then (stably) by length.
pub fn sort_tags(tags: &[String]) -> Vec<String> {
    let mut tags = tags.to_vec();
    tags.sort();
    tags.sort_by_key(String::len);
    tags
}

/// Default worker pool size: available hardware parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Query every backend of the session's provider.
///
/// Descriptors come back in provider enumeration order regardless of which
/// worker finished first.
pub async fn list_backends<C>(
    session: &Session<C>,
    max_workers: usize,
) -> DispatchResult<Vec<BackendDescriptor>>
where
    C: Send + Sync + 'static,
{
    let backends = session.provider().backends().await?;
    debug!(count = backends.len(), max_workers, "querying backends");

    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut workers = JoinSet::new();

    for (position, backend) in backends.into_iter().enumerate() {
        let permits = permits.clone();
        workers.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| DispatchError::Worker(e.to_string()))?;
            describe(backend.as_ref())
                .await
                .map(|descriptor| (position, descriptor))
        });
    }

    let mut rows = Vec::with_capacity(workers.len());
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(row)) => rows.push(row),
            Ok(Err(e)) => {
                workers.abort_all();
                return Err(e);
            }
            Err(e) => {
                workers.abort_all();
                return Err(DispatchError::Worker(e.to_string()));
            }
        }
    }

    rows.sort_by_key(|(position, _)| *position);
    Ok(rows.into_iter().map(|(_, descriptor)| descriptor).collect())
}

/// Build one descriptor from a status and a properties query run concurrently.
async fn describe<C>(backend: &dyn Backend<C>) -> DispatchResult<BackendDescriptor> {
    let (status, properties) = tokio::join!(backend.status(), backend.properties());
    let pending_jobs = status?.pending_jobs;

    match properties {
        Ok(caps) => Ok(BackendDescriptor::hardware(
            backend.name(),
            pending_jobs,
            caps.num_qubits,
            &caps.features,
        )),
        Err(ServiceError::MissingAttribute(attr)) => {
            debug!(backend = backend.name(), attr = %attr, "no device properties, treating as simulated");
            Ok(BackendDescriptor::simulated(backend.name(), pending_jobs))
        }
        Err(e) => Err(e.into()),
    }
}
