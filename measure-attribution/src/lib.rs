#![deny(missing_docs)]
//! The attribution game (§4.C, §4.D): a catalogue of time-window attribution rules plus the
//! reverse-scan engine that applies one rule to a user's touchpoint/conversion rows.
//!
//! Nothing in this crate branches on secret data. Every rule is a small secure circuit built out
//! of [`measure_core::SecValue`] comparisons and muxes, and the engine's winner-selection is a
//! single pass with a running "already has a winner" bit rather than a data-dependent early exit.

pub mod engine;
pub mod rule_selection;
pub mod rules;
pub mod secret;

pub use engine::{attribute_reverse_scan, AttributionOutcome};
pub use rule_selection::RuleSelection;
pub use rules::rule_by_id;
pub use secret::{SecConversion, SecTouchpoint};
