#![deny(missing_docs)]
//! The secure value layer (§4.A): a thin typed facade over an abstract two-party secure
//! computation backend.
//!
//! This crate does not implement any oblivious primitive (§1 Non-goals: "No implementation of
//! oblivious primitives"). It defines the [`SecureBackend`] trait as the seam a real MPC runtime
//! (garbled circuits, arithmetic secret sharing, ...) would sit behind, plus [`SecValue`], the
//! typed wrapper the rest of the system (`measure-attribution`, `measure-aggregation`,
//! `measure-lift`, `measure-combiner`) is written against. [`local::LocalBackend`] is a
//! single-process, privacy-*un*aware implementation of the same trait used only by tests and
//! single-process demos — it computes the ideal-functionality result directly rather than
//! running a real two-party protocol, and must never be used where confidentiality matters.

pub mod backend;
pub mod local;
pub mod value;
pub mod width;

pub use backend::{BackendError, BackendResult, SecureBackend};
pub use value::{Layout, SecValue};
pub use width::Width;
