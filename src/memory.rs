//! In-process implementation of the service interface.
//!
//! Backs the test suite and the demo CLI. Everything the real service does
//! that the pipeline depends on is modeled: account authentication against a
//! saved token, hardware backends with device properties and simulators
//! without, per-job item caps, queue progress over successive polls, jobs
//! that fail, and individual items whose result data is unavailable.
//!
//! Work items are [`Circuit`]s. Outcomes are computed by tracking basis
//! states through `x` and `cx`; `h` is modeled as a fair coin that splits
//! every branch in two.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashSet;

use crate::backend::{Authenticator, Backend, BackendStatus, JobLimits, Provider, RemoteJob};
use crate::capability::{Capabilities, Topology};
use crate::credentials::CredentialStore;
use crate::error::{ServiceError, ServiceResult};
use crate::job::{JobId, JobStatus};
use crate::result::Counts;

/// A gate applied to one or two qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    /// Gate name (OpenQASM 3 naming).
    pub name: String,
    /// Qubits the gate acts on.
    pub qubits: Vec<u32>,
}

/// Work item: a named gate sequence over a fixed number of qubits, measured
/// in full at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    /// Circuit name.
    pub name: String,
    /// Number of qubits (and classical bits).
    pub num_qubits: u32,
    /// Gates in application order.
    pub gates: Vec<Gate>,
    /// Backend the circuit was transpiled for.
    pub target: Option<String>,
    /// Two-qubit gates on uncoupled qubits that needed routing.
    pub routed_gates: u32,
}

impl Circuit {
    /// Empty circuit.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gates: vec![],
            target: None,
            routed_gates: 0,
        }
    }

    /// Append an arbitrary gate.
    pub fn gate(mut self, name: impl Into<String>, qubits: &[u32]) -> Self {
        self.gates.push(Gate {
            name: name.into(),
            qubits: qubits.to_vec(),
        });
        self
    }

    /// Hadamard.
    pub fn h(self, q: u32) -> Self {
        self.gate("h", &[q])
    }

    /// Pauli X.
    pub fn x(self, q: u32) -> Self {
        self.gate("x", &[q])
    }

    /// Controlled NOT.
    pub fn cx(self, control: u32, target: u32) -> Self {
        self.gate("cx", &[control, target])
    }

    /// Outcome histogram for `shots` executions.
    ///
    /// Labels put qubit 0 rightmost. Shots are split evenly between branches,
    /// the remainder going to the first ones.
    pub fn sample(&self, shots: u32) -> Counts {
        let width = self.num_qubits as usize;
        let mut branches = vec![vec![false; width]];

        for gate in &self.gates {
            let qubits: Vec<usize> = gate.qubits.iter().map(|&q| q as usize).collect();
            if qubits.iter().any(|&q| q >= width) {
                continue;
            }
            match (gate.name.as_str(), qubits.as_slice()) {
                ("x", &[q]) => branches.iter_mut().for_each(|b| b[q] = !b[q]),
                ("cx", &[c, t]) => branches
                    .iter_mut()
                    .filter(|b| b[c])
                    .for_each(|b| b[t] = !b[t]),
                ("h", &[q]) => {
                    let flipped: Vec<_> = branches
                        .iter()
                        .cloned()
                        .map(|mut b| {
                            b[q] = !b[q];
                            b
                        })
                        .collect();
                    branches.extend(flipped);
                }
                _ => {}
            }
        }

        let n = branches.len() as u64;
        let (share, extra) = (u64::from(shots) / n, u64::from(shots) % n);
        let mut counts = Counts::new();
        for (i, bits) in branches.iter().enumerate() {
            let label: String = bits.iter().rev().map(|&b| if b { '1' } else { '0' }).collect();
            counts.insert(label, share + u64::from((i as u64) < extra));
        }
        counts
    }
}

impl fmt::Display for Circuit {
    /// One line per qubit, one column per gate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for q in 0..self.num_qubits {
            write!(f, "q{q}: ")?;
            for gate in &self.gates {
                let cell = match gate.qubits.iter().position(|&g| g == q) {
                    Some(0) if gate.qubits.len() == 2 => "■".to_string(),
                    Some(_) if gate.name == "cx" => "X".to_string(),
                    Some(_) => gate.name.to_uppercase(),
                    None => "─".to_string(),
                };
                write!(f, "─{cell:─^3}─")?;
            }
            writeln!(f, "─M")?;
        }
        Ok(())
    }
}

/// A job whose lifecycle is scripted by poll count.
///
/// Reports `Queued` for the first `queue_depth` polls with a decreasing
/// queue position, `Running` once, then its terminal state.
pub struct MemoryJob {
    id: JobId,
    queue_depth: u32,
    polls: AtomicU32,
    results: Vec<Option<Counts>>,
    failure: Option<String>,
}

impl MemoryJob {
    /// Job with the given per-item results; `None` marks unavailable data.
    pub fn new(id: impl Into<JobId>, queue_depth: u32, results: Vec<Option<Counts>>) -> Self {
        Self {
            id: id.into(),
            queue_depth,
            polls: AtomicU32::new(0),
            results,
            failure: None,
        }
    }

    /// A job with no items that completes on the second poll.
    pub fn completed(id: &str) -> Self {
        Self::new(id, 0, vec![])
    }

    /// A job with no items that waits `queue_depth` polls in the queue.
    pub fn queued(id: &str, queue_depth: u32) -> Self {
        Self::new(id, queue_depth, vec![])
    }

    /// A job that ends in `Failed(reason)`.
    pub fn failed(id: &str, reason: &str) -> Self {
        Self::new(id, 0, vec![]).with_failure(reason)
    }

    /// End in `Failed(reason)` instead of `Completed`.
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }
}

#[async_trait]
impl RemoteJob for MemoryJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    async fn status(&self) -> ServiceResult<JobStatus> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(if poll < self.queue_depth {
            JobStatus::Queued
        } else if poll == self.queue_depth {
            JobStatus::Running
        } else {
            match &self.failure {
                Some(reason) => JobStatus::Failed(reason.clone()),
                None => JobStatus::Completed,
            }
        })
    }

    async fn queue_position(&self) -> ServiceResult<Option<u32>> {
        let poll = self.polls.load(Ordering::SeqCst).saturating_sub(1);
        Ok((poll < self.queue_depth).then(|| self.queue_depth - poll))
    }

    async fn counts(&self, index: usize) -> ServiceResult<Counts> {
        if let Some(reason) = &self.failure {
            return Err(ServiceError::JobFailed(format!("{}: {reason}", self.id)));
        }
        match self.results.get(index) {
            Some(Some(counts)) => Ok(counts.clone()),
            Some(None) => Err(ServiceError::ResultUnavailable { index }),
            None => Err(ServiceError::NotFound(format!(
                "item {index} of job {}",
                self.id
            ))),
        }
    }
}

/// An in-memory backend.
pub struct MemoryBackend {
    name: String,
    properties: Option<Capabilities>,
    limits: JobLimits,
    pending_jobs: u32,
    queue_depth: u32,
    status_error: Option<String>,
    job_failure: Option<String>,
    unavailable: FxHashSet<usize>,
    submitted_items: AtomicUsize,
    submitted_jobs: AtomicUsize,
}

impl MemoryBackend {
    fn with_properties(name: impl Into<String>, properties: Option<Capabilities>) -> Self {
        Self {
            name: name.into(),
            properties,
            limits: JobLimits::default(),
            pending_jobs: 0,
            queue_depth: 0,
            status_error: None,
            job_failure: None,
            unavailable: FxHashSet::default(),
            submitted_items: AtomicUsize::new(0),
            submitted_jobs: AtomicUsize::new(0),
        }
    }

    /// Hardware backend with `num_qubits` on a linear coupling map.
    pub fn hardware(name: impl Into<String>, num_qubits: u32) -> Self {
        Self::with_properties(name, Some(Capabilities::ibm_eagle(num_qubits)))
    }

    /// Simulator: reports no device properties.
    pub fn simulator(name: impl Into<String>) -> Self {
        Self::with_properties(name, None)
    }

    /// Jobs already waiting in the backend queue.
    pub fn with_pending_jobs(mut self, pending_jobs: u32) -> Self {
        self.pending_jobs = pending_jobs;
        self
    }

    /// Replace the feature tags of a hardware backend.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = self.properties.map(|caps| caps.with_features(features));
        self
    }

    /// Replace the coupling map of a hardware backend.
    pub fn with_coupling(mut self, edges: Vec<(u32, u32)>) -> Self {
        self.properties = self
            .properties
            .map(|caps| caps.with_topology(Topology::custom(edges)));
        self
    }

    /// Per-job item cap.
    pub fn with_max_items_per_job(mut self, cap: usize) -> Self {
        self.limits.max_items_per_job = cap;
        self
    }

    /// Shots used when a submission gives none.
    pub fn with_default_shots(mut self, shots: u32) -> Self {
        self.limits.default_shots = shots;
        self
    }

    /// Polls each submitted job spends queued.
    pub fn with_queue_depth(mut self, depth: u32) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Make status queries fail with a transport error.
    pub fn with_status_error(mut self, reason: impl Into<String>) -> Self {
        self.status_error = Some(reason.into());
        self
    }

    /// Make every submitted job fail.
    pub fn with_job_failure(mut self, reason: impl Into<String>) -> Self {
        self.job_failure = Some(reason.into());
        self
    }

    /// Report no data for these items. Indices count every item ever
    /// submitted to this backend, across jobs.
    pub fn with_unavailable_results(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.unavailable.extend(indices);
        self
    }

    /// Number of jobs submitted so far.
    pub fn submitted_jobs(&self) -> usize {
        self.submitted_jobs.load(Ordering::SeqCst)
    }

    fn target(&self) -> Capabilities {
        self.properties
            .clone()
            .unwrap_or_else(|| Capabilities::simulator(32))
    }
}

#[async_trait]
impl Backend<Circuit> for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> JobLimits {
        self.limits
    }

    async fn status(&self) -> ServiceResult<BackendStatus> {
        match &self.status_error {
            Some(reason) => Err(ServiceError::Transport(reason.clone())),
            None => Ok(BackendStatus {
                pending_jobs: self.pending_jobs,
            }),
        }
    }

    async fn properties(&self) -> ServiceResult<Capabilities> {
        self.properties
            .clone()
            .ok_or_else(|| ServiceError::MissingAttribute("properties".into()))
    }

    async fn transpile(&self, items: &[Circuit]) -> ServiceResult<Vec<Circuit>> {
        let target = self.target();
        items
            .iter()
            .map(|circuit| {
                if circuit.num_qubits > target.num_qubits {
                    return Err(ServiceError::Rejected(format!(
                        "{} needs {} qubits, {} has {}",
                        circuit.name, circuit.num_qubits, self.name, target.num_qubits
                    )));
                }
                let mut adapted = circuit.clone();
                for gate in &circuit.gates {
                    if !target.gate_set.contains(&gate.name) {
                        return Err(ServiceError::Rejected(format!(
                            "{}: gate '{}' is not supported by {}",
                            circuit.name, gate.name, self.name
                        )));
                    }
                    if gate.qubits.iter().any(|&q| q >= circuit.num_qubits) {
                        return Err(ServiceError::Rejected(format!(
                            "{}: gate '{}' addresses a qubit outside the circuit",
                            circuit.name, gate.name
                        )));
                    }
                    if let &[a, b] = gate.qubits.as_slice() {
                        if !target.topology.is_connected(a, b) {
                            adapted.routed_gates += 1;
                        }
                    }
                }
                adapted.target = Some(self.name.clone());
                Ok(adapted)
            })
            .collect()
    }

    async fn submit(
        &self,
        items: Vec<Circuit>,
        shots: Option<u32>,
    ) -> ServiceResult<Arc<dyn RemoteJob>> {
        if items.len() > self.limits.max_items_per_job {
            return Err(ServiceError::Rejected(format!(
                "{} items exceed the per-job limit of {}",
                items.len(),
                self.limits.max_items_per_job
            )));
        }

        let shots = shots.unwrap_or(self.limits.default_shots);
        let offset = self.submitted_items.fetch_add(items.len(), Ordering::SeqCst);
        let seq = self.submitted_jobs.fetch_add(1, Ordering::SeqCst);

        let results = items
            .iter()
            .enumerate()
            .map(|(i, circuit)| {
                (!self.unavailable.contains(&(offset + i))).then(|| circuit.sample(shots))
            })
            .collect();

        let mut job = MemoryJob::new(format!("{}-{seq}", self.name), self.queue_depth, results);
        if let Some(reason) = &self.job_failure {
            job = job.with_failure(reason.clone());
        }
        Ok(Arc::new(job))
    }
}

/// Provider over a fixed set of in-memory backends.
pub struct MemoryProvider {
    backends: Vec<Arc<MemoryBackend>>,
}

#[async_trait]
impl Provider<Circuit> for MemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn backends(&self) -> ServiceResult<Vec<Arc<dyn Backend<Circuit>>>> {
        Ok(self
            .backends
            .iter()
            .map(|b| b.clone() as Arc<dyn Backend<Circuit>>)
            .collect())
    }

    async fn get_backend(&self, name: &str) -> ServiceResult<Arc<dyn Backend<Circuit>>> {
        self.backends
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.clone() as Arc<dyn Backend<Circuit>>)
            .ok_or_else(|| ServiceError::NotFound(format!("backend {name}")))
    }
}

/// In-memory service account.
#[derive(Default)]
pub struct InMemoryService {
    backends: Vec<Arc<MemoryBackend>>,
    required_token: Option<String>,
    token: Option<String>,
    store: Option<CredentialStore>,
    auth_calls: AtomicUsize,
}

impl InMemoryService {
    /// Service with no backends that accepts any caller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend.
    pub fn with_backend(mut self, backend: MemoryBackend) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Only accept callers presenting `token`.
    pub fn with_required_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// Present `token` when authenticating.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the presented token from `store` when none is set directly.
    pub fn with_credential_store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// How many times [`Authenticator::authenticate`] ran.
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    /// The backends this service exposes.
    pub fn backends(&self) -> &[Arc<MemoryBackend>] {
        &self.backends
    }

    fn presented_token(&self) -> ServiceResult<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.store {
            Some(store) => store
                .load()
                .map(|saved| saved.map(|c| c.token))
                .map_err(|e| ServiceError::Authentication(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Authenticator<Circuit> for InMemoryService {
    async fn authenticate(&self) -> ServiceResult<Arc<dyn Provider<Circuit>>> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(required) = &self.required_token {
            match self.presented_token()? {
                None => {
                    return Err(ServiceError::Authentication(
                        "no saved credential found".into(),
                    ));
                }
                Some(token) if &token != required => {
                    return Err(ServiceError::Authentication("token rejected".into()));
                }
                Some(_) => {}
            }
        }

        Ok(Arc::new(MemoryProvider {
            backends: self.backends.clone(),
        }))
    }
}
