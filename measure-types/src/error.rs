//! The error kinds of §7, shared by every game crate.
//!
//! Every fatal path in the system resolves to one of these variants. There is no local recovery
//! or retry (§7): a [`MeasurementError`] is always fatal to the current shard or process, and the
//! orchestrator's top level is the only place that converts one into an exit code.

use std::path::PathBuf;

/// A [`std::result::Result`] alias defaulting the error type to [`MeasurementError`].
pub type Result<T> = std::result::Result<T, MeasurementError>;

/// Every fatal error kind a measurement game can raise.
///
/// Variants map 1:1 onto §7's seven error kinds. Each carries enough context to produce the
/// single diagnostic line §7 requires (input file name plus kind).
#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    /// Malformed CSV, JSON parse failure, or a missing required column.
    #[error("input format error in {path}: {reason}")]
    InputFormat {
        /// The input file that failed to parse.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// Touchpoints/conversions exceeded their configured cap, or the ad-id universe exceeded
    /// the 16-bit compressed-id space.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Row-count mismatch between parties, a threshold-list length mismatch, or an empty shard
    /// list.
    #[error("protocol state error: {0}")]
    ProtocolState(String),

    /// A shard-combiner root was not the expected shape, or a required key was missing.
    #[error("schema error: {0}")]
    Schema(String),

    /// An unknown attribution-rule name or id, or an unknown aggregator.
    #[error("policy error: {0}")]
    Policy(String),

    /// An input path could not be read, or an output path could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A failure from the abstract secure-computation backend (ORAM, scheduler, network).
    #[error("secure computation backend error: {0}")]
    Backend(String),
}

impl MeasurementError {
    /// Builds an [`MeasurementError::InputFormat`] from a path and a display-able reason.
    pub fn input_format(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::InputFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds an [`MeasurementError::Io`] from a path and an [`std::io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
