#![deny(missing_docs)]
//! The aggregation game (§4.E): ad-id compression, the oblivious bucketing abstraction, and
//! reveal.
//!
//! Compression is its own step (see [`compress`]) rather than folded into bucketing, matching
//! §4.E's numbered steps 1-4 being independently describable. [`oram`] models the write-only
//! additive ORAM primitive §4.E calls canonical; the legacy "partner-encrypts, publisher-adds"
//! summation path is explicitly not implemented (§9: ORAM path is canonical, the other is
//! acceptable-but-not-required).

pub mod compress;
pub mod engine;
pub mod oram;

pub use compress::{compress_ad_ids_across_users, CompressionOutput};
pub use engine::{aggregate, reveal};
pub use oram::{LocalObliviousStore, ObliviousStore, ObliviousWrite};
