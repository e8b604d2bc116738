#![deny(missing_docs)]
//! Orchestration layer (§4.H, §5, §6, §7): the CLI surface, shard fan-out, and per-worker
//! statistics shared by the four game binaries.
//!
//! `measure-core` has no real two-party network agent (§1 Non-goals: "no implementation of
//! oblivious primitives or a real MPC runtime"), so every binary here runs each shard against a
//! same-process [`measure_core::local::LocalBackend`] standing in for what a real deployment
//! would run as two separate processes speaking to each other over the `server_ip`/`port`
//! socket — the same relationship `oprf-service-example` has to the production `oprf-service`
//! binary it demonstrates.

pub mod common;
pub mod fanout;
pub mod stats;

pub use common::CommonArgs;
pub use fanout::run_sharded;
pub use stats::ShardStats;

/// Initializes a `tracing-subscriber` `EnvFilter` subscriber reading `RUST_LOG` (falling back to
/// `info`), the same setup every binary in this crate uses before doing any work.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
