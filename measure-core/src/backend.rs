//! The [`SecureBackend`] trait: the seam between the Secure Value Layer and a real two-party
//! secure computation runtime (§4.A, §9 "Template/compile-time specialization").

use measure_types::Party;

use crate::width::Width;

/// A [`std::result::Result`] alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Any failure of an underlying secure-computation primitive is fatal to the run (§4.A: "Any
/// failure of an underlying primitive propagates as a fatal error").
#[derive(Debug, thiserror::Error)]
#[error("secure computation backend error: {0}")]
pub struct BackendError(pub String);

impl From<BackendError> for measure_types::MeasurementError {
    fn from(value: BackendError) -> Self {
        measure_types::MeasurementError::Backend(value.0)
    }
}

/// An abstract two-party secure computation backend.
///
/// Every method corresponds to one operation of §4.A. Implementations are free to batch,
/// reorder, or lazily schedule gate submissions (§5: "Calling code submits gate ops that may be
/// reordered and batched") as long as per-scheduler data-dependency order is observed. `width` is
/// passed explicitly on every op because a single backend instance serves all four widths of
/// [`Width`] rather than being generic over it — this mirrors §9's note that width/layout become
/// generic parameters only at the `measure-core` call-site, not inside the backend itself.
///
/// `Self::Share` is an opaque per-party share handle; nothing outside a [`crate::SecValue`] and
/// the backend implementation should construct, inspect, or clone one directly.
pub trait SecureBackend {
    /// Opaque per-value share handle.
    type Share: Clone + std::fmt::Debug;

    /// The party this backend instance executes as.
    fn party(&self) -> Party;

    /// Constructs a share from a value known in the clear to `owner`. On the non-owning party's
    /// instance this is the share of an unknown value, not a literal zero.
    fn from_plaintext(&mut self, owner: Party, width: Width, value: u64) -> Self::Share;

    /// Constructs a share of a value both parties already know in the clear (e.g. rule-window
    /// constants like `86400`), with no secret exchange needed.
    fn constant(&mut self, width: Width, value: u64) -> Self::Share;

    /// Constructs a share directly from a pre-extracted share value (§3: XOR-shared input modes,
    /// where the CSV already contains this party's share rather than a plaintext).
    fn from_share_bits(&mut self, width: Width, share: u64) -> Self::Share;

    /// `a + b`, modular at `width`.
    fn add(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a - b`, modular at `width`.
    fn sub(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a * b`, modular at `width` (e.g. squaring a per-user value sum).
    fn mul(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a == b`, returned as a [`Width::Bit`] share.
    fn equal(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a < b` (unsigned), returned as a [`Width::Bit`] share.
    fn less_than(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a & b`, bitwise, at `width`.
    fn and(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `a | b`, bitwise, at `width`.
    fn or(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// `!a`, bitwise, at `width`.
    fn not(&mut self, width: Width, a: &Self::Share) -> Self::Share;

    /// `cond ? b : a`, in one gate layer (§4.A). `cond` must be a [`Width::Bit`] share.
    fn mux(
        &mut self,
        width: Width,
        cond: &Self::Share,
        a: &Self::Share,
        b: &Self::Share,
    ) -> Self::Share;

    /// Reveals `value` to `party`; the calling party's local result is the plaintext if
    /// `party == self.party()`, or zero otherwise (§4.A).
    fn open_to_party(&mut self, party: Party, width: Width, value: &Self::Share) -> BackendResult<u64>;

    /// Batched variant of [`SecureBackend::open_to_party`] (§4.A: "batched variants returning
    /// vectors").
    fn open_to_party_batch(
        &mut self,
        party: Party,
        width: Width,
        values: &[Self::Share],
    ) -> BackendResult<Vec<u64>> {
        values
            .iter()
            .map(|v| self.open_to_party(party, width, v))
            .collect()
    }
}
