#![deny(missing_docs)]
//! Synthetic fixtures and a loopback two-party test harness shared by the game crates'
//! integration tests and by `measure-orchestrator`'s demo binaries.

pub mod fixtures;
pub mod harness;

pub use fixtures::{synthetic_attribution_csv, synthetic_lift_rows};
pub use harness::{run_two_party, TwoPartyBackends};
