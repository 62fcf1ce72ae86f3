//! Backend capability metadata.
//!
//! [`Capabilities`] is what a hardware backend reports when asked for its
//! detailed properties: qubit count, supported gates, connectivity, and
//! feature tags. Simulators do not report it at all; the directory tags
//! them with the simulated marker instead.
//!
//! Adaptation of work items to a backend (transpilation) reads the gate set
//! and topology; the directory renders the qubit count and feature tags.

use serde::{Deserialize, Serialize};

/// Detailed properties of a hardware backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gate set (OpenQASM 3 naming convention).
    pub gate_set: GateSet,
    /// Qubit connectivity topology. All edges are bidirectional.
    pub topology: Topology,
    /// Feature tags, rendered in the backend directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for a simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            gate_set: GateSet::universal(),
            topology: Topology::full(num_qubits),
            features: vec![],
        }
    }

    /// Create capabilities for IBM Eagle processors (ECR native).
    pub fn ibm_eagle(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            gate_set: GateSet::ibm_eagle(),
            topology: Topology::linear(num_qubits),
            features: vec!["dynamic_circuits".into()],
        }
    }

    /// Override the topology with real hardware connectivity.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Replace the feature tags.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }
}

/// Gate set supported by a backend.
///
/// The `native` list identifies gates that execute without decomposition.
/// If `native` is empty, all supported gates are considered native
/// (typical for simulators).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
}

impl GateSet {
    /// IBM Eagle gate set. Native: `ecr, rz, sx, x`.
    pub fn ibm_eagle() -> Self {
        Self {
            single_qubit: to_strings(&["rz", "sx", "x", "id", "h"]),
            two_qubit: to_strings(&["ecr", "cx"]),
        }
    }

    /// Universal gate set, typical for simulators.
    pub fn universal() -> Self {
        Self {
            single_qubit: to_strings(&[
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz",
            ]),
            two_qubit: to_strings(&["cx", "cy", "cz", "swap", "ecr", "rzz"]),
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate) || self.two_qubit.iter().any(|g| g == gate)
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

/// Qubit connectivity topology.
///
/// All edges are bidirectional: if `(a, b)` is listed, both `a → b`
/// and `b → a` are valid two-qubit interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Kind of topology.
    pub kind: TopologyKind,
    /// Coupling edges (pairs of connected qubits).
    pub edges: Vec<(u32, u32)>,
}

impl Topology {
    /// Create a linear topology.
    pub fn linear(n: u32) -> Self {
        let edges: Vec<_> = (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        Self {
            kind: TopologyKind::Linear,
            edges,
        }
    }

    /// Create a fully connected topology.
    pub fn full(n: u32) -> Self {
        let mut edges = vec![];
        for i in 0..n {
            for j in (i + 1)..n {
                edges.push((i, j));
            }
        }
        Self {
            kind: TopologyKind::FullyConnected,
            edges,
        }
    }

    /// Create a custom topology from edges.
    pub fn custom(edges: Vec<(u32, u32)>) -> Self {
        Self {
            kind: TopologyKind::Custom,
            edges,
        }
    }

    /// Check if two qubits are connected.
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        if self.kind == TopologyKind::FullyConnected {
            return q1 != q2;
        }
        self.edges
            .iter()
            .any(|&(a, b)| (a == q1 && b == q2) || (a == q2 && b == q1))
    }
}

/// Kind of qubit topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyKind {
    /// Fully connected (all-to-all).
    FullyConnected,
    /// Linear chain.
    Linear,
    /// Custom topology.
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_simulator() {
        let caps = Capabilities::simulator(10);
        assert!(caps.features.is_empty());
        assert_eq!(caps.num_qubits, 10);
        assert!(caps.gate_set.contains("h"));
    }

    #[test]
    fn test_capabilities_with_features() {
        let caps = Capabilities::ibm_eagle(127).with_features(["qasm3", "pec"]);
        assert_eq!(caps.num_qubits, 127);
        assert_eq!(caps.features, ["qasm3", "pec"]);
    }

    #[test]
    fn test_topology_linear() {
        let topo = Topology::linear(5);
        assert!(topo.is_connected(0, 1));
        assert!(topo.is_connected(2, 1));
        assert!(!topo.is_connected(0, 2));
    }

    #[test]
    fn test_topology_full() {
        let topo = Topology::full(4);
        assert!(topo.is_connected(0, 3));
        assert!(!topo.is_connected(2, 2));
    }

    #[test]
    fn test_gate_set_contains() {
        let gs = GateSet::ibm_eagle();
        assert!(gs.contains("cx"));
        assert!(gs.contains("ecr"));
        assert!(!gs.contains("cz"));
        assert!(GateSet::universal().contains("swap"));
    }
}
