//! HAL Dispatch: batch job orchestration against remote quantum backends.
//!
//! This crate takes an ordered batch of work items, picks a backend (by name
//! or by asking the operator), adapts and submits the items in capped
//! chunks, follows the last job to completion, and gathers one result
//! record per item in input order.
//!
//! # Overview
//!
//! - [`Dispatcher`] is the context object tying the pipeline together
//! - [`Authenticator`], [`Provider`], [`Backend`] and [`RemoteJob`] are the
//!   seams to the remote service, generic over the work item type `C`
//! - [`list_backends`] queries every backend in parallel and returns
//!   [`BackendDescriptor`]s in provider order
//! - [`select_backend`] asks a [`Chooser`] to pick one
//! - [`submit`] splits a batch into a [`JobBatch`] of [`JobHandle`]s
//! - [`monitor`] polls one job until it is terminal
//! - [`collect`] turns a batch into [`ResultRecord`]s
//! - [`ResultWriter`] and [`CredentialStore`] persist results and tokens
//! - [`memory`] is an in-process service used by tests and the demo
//!
//! # Pipeline
//!
//! ```text
//!   session() ──→ list_backends() ──→ select ──→ submit() ──→ monitor() ──→ collect()
//!   (cached)       (parallel)         (prompt)   (chunked)    (last job)    (in order)
//! ```
//!
//! ```ignore
//! use hal_dispatch::{BackendChoice, DispatchConfig, Dispatcher};
//!
//! let dispatcher = Dispatcher::new(authenticator, DispatchConfig::from_env()?, chooser);
//! let (batch, records) = dispatcher
//!     .run(circuits, BackendChoice::default(), Some(4000))
//!     .await?;
//! assert_eq!(records.len(), batch.item_count());
//! ```

pub mod aggregate;
pub mod backend;
pub mod capability;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod memory;
pub mod monitor;
pub mod persist;
pub mod result;
pub mod selector;
pub mod session;
pub mod submit;
pub mod timer;

pub use aggregate::collect;
pub use backend::{Authenticator, Backend, BackendStatus, JobLimits, Provider, RemoteJob};
pub use capability::{Capabilities, GateSet, Topology, TopologyKind};
pub use config::DispatchConfig;
pub use credentials::{CredentialStore, Credentials};
pub use directory::{BackendDescriptor, list_backends};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult, ServiceError, ServiceResult};
pub use job::{JobBatch, JobHandle, JobId, JobStatus};
pub use monitor::monitor;
pub use persist::{ResultFormat, ResultWriter};
pub use result::{Counts, ResultRecord};
pub use selector::{BackendChoice, Chooser, select_backend};
pub use session::{Session, SessionManager};
pub use submit::submit;
pub use timer::{PrintTimer, Progress};
