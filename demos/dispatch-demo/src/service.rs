//! The account and workload the demo runs against.

use hal_dispatch::CredentialStore;
use hal_dispatch::memory::{Circuit, InMemoryService, MemoryBackend};

/// Token the demo account accepts.
pub const DEMO_TOKEN: &str = "demo";

/// Width of the generated circuits.
const WIDTH: u32 = 8;

/// A small fleet: two hardware devices, one with a tight per-job cap, and a
/// simulator. Authentication reads the token saved in `store`.
pub fn demo_service(store: CredentialStore) -> InMemoryService {
    InMemoryService::new()
        .with_required_token(DEMO_TOKEN)
        .with_credential_store(store)
        .with_backend(
            MemoryBackend::hardware("ibm_kyiv", 127)
                .with_pending_jobs(12)
                .with_features(["qasm3", "dynamic", "pec", "zne"])
                .with_queue_depth(3),
        )
        .with_backend(
            MemoryBackend::hardware("ibm_nazca", 127)
                .with_pending_jobs(2)
                .with_max_items_per_job(100)
                .with_queue_depth(1),
        )
        .with_backend(MemoryBackend::simulator("simulator_mps"))
}

/// `count` circuits; circuit `i` prepares the binary encoding of `i` (mod
/// 64) on the low six qubits and entangles the top pair, so results can be matched to inputs.
pub fn workload(count: usize) -> Vec<Circuit> {
    (0..count)
        .map(|i| {
            let value = i % (1 << (WIDTH - 2));
            let mut circuit = Circuit::new(format!("encode-{i}"), WIDTH);
            for bit in 0..WIDTH - 2 {
                if value & (1 << bit) != 0 {
                    circuit = circuit.x(bit);
                }
            }
            circuit.h(WIDTH - 2).cx(WIDTH - 2, WIDTH - 1)
        })
        .collect()
}
