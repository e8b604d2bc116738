#![deny(missing_docs)]
//! The shard combiner (§4.G): sums `N` shards' metric trees, applies the k-anonymity threshold
//! gate to lift-shaped shards, and reveals the result under one of four visibility modes.

pub mod gate;
pub mod reduce;
pub mod reveal;

pub use gate::{gate_grouped_lift_tree, SENTINEL};
pub use reduce::combine_shards;
pub use reveal::reveal_tree;
