//! Per-worker protocol statistics (§4.H: "non-free-gate count, free-gate count, sent bytes,
//! received bytes... summed across workers").
//!
//! `measure-core`'s [`measure_core::local::LocalBackend`] computes everything locally and has no
//! real network agent or gate-level instrumentation, so `non_free_gate_count` here counts
//! secure-value operations actually dispatched (a real backend's multiplication/AND gates) and
//! `sent_bytes`/`received_bytes` count serialized output size as a stand-in for what a networked
//! agent would have exchanged. A real backend wired in here would report true gate and byte
//! counts through the same struct.

use std::ops::AddAssign;

/// Protocol-level counters for one shard or one worker's summed shards.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardStats {
    /// Count of non-free (multiplication/AND) gate evaluations.
    pub non_free_gate_count: u64,
    /// Count of free (XOR/addition) gate evaluations.
    pub free_gate_count: u64,
    /// Bytes sent to the other party.
    pub sent_bytes: u64,
    /// Bytes received from the other party.
    pub received_bytes: u64,
}

impl ShardStats {
    /// A stats record for one shard that performed `non_free_gates` non-free operations and
    /// produced `output_len` bytes of revealed output.
    pub fn for_shard(non_free_gates: u64, output_len: usize) -> Self {
        Self {
            non_free_gate_count: non_free_gates,
            free_gate_count: 0,
            sent_bytes: output_len as u64,
            received_bytes: output_len as u64,
        }
    }
}

impl AddAssign for ShardStats {
    fn add_assign(&mut self, other: Self) {
        self.non_free_gate_count += other.non_free_gate_count;
        self.free_gate_count += other.free_gate_count;
        self.sent_bytes += other.sent_bytes;
        self.received_bytes += other.received_bytes;
    }
}

impl std::iter::Sum for ShardStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, x| {
            acc += x;
            acc
        })
    }
}
