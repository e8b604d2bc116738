#![deny(missing_docs)]
//! The lift game (§4.F): population derivation, per-user event/converter/value computation, and
//! cohort/publisher-breakdown fan-out.

pub mod config;
pub mod engine;
pub mod events;
pub mod population;
pub mod secret;
pub mod valid;

pub use config::LiftConfig;
pub use engine::{compute_grouped_metrics, compute_metrics, GroupedSecLiftMetrics, SecLiftMetrics};
pub use secret::SecUserRow;
