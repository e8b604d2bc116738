//! [`SecValue`]: the typed, batch-polymorphic wrapper the rest of the system programs against
//! (§4.A).

use measure_types::{MeasurementError, Party, Result};

use crate::backend::SecureBackend;
use crate::width::Width;

/// Whether a [`SecValue`] holds a single value or a lane-aligned batch (§4.A: "every typed value
/// is either scalar or a batch of `B` aligned values; batched ops act lane-wise").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// A single value.
    Scalar,
    /// `n` lane-aligned values; every operand in a binary op must share this `n`.
    Batch(usize),
}

impl Layout {
    /// Number of lanes (`1` for [`Layout::Scalar`]).
    pub fn len(self) -> usize {
        match self {
            Layout::Scalar => 1,
            Layout::Batch(n) => n,
        }
    }

    /// Whether this layout holds zero lanes.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A typed secret-shared value (or lane-aligned batch of values) at a fixed [`Width`].
///
/// Which backend `B` and layout a given instance uses is a construction-time choice; every
/// arithmetic method is written once and works identically for scalar and batched values,
/// per §4.A's "the rest of the system is written polymorphically" requirement.
#[derive(Clone)]
pub struct SecValue<B: SecureBackend> {
    width: Width,
    layout: Layout,
    shares: Vec<B::Share>,
}

impl<B: SecureBackend> SecValue<B> {
    /// This value's width.
    pub fn width(&self) -> Width {
        self.width
    }

    /// This value's layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn from_shares(width: Width, layout: Layout, shares: Vec<B::Share>) -> Self {
        debug_assert_eq!(shares.len(), layout.len());
        Self {
            width,
            layout,
            shares,
        }
    }

    /// Constructs a scalar value from a plaintext owned by `owner` (§4.A constructor (a)).
    pub fn from_plaintext(backend: &mut B, owner: Party, width: Width, value: u64) -> Self {
        let share = backend.from_plaintext(owner, width, value);
        Self::from_shares(width, Layout::Scalar, vec![share])
    }

    /// Constructs a batch of values, one share per lane, from plaintexts owned by `owner`.
    pub fn from_plaintext_batch(
        backend: &mut B,
        owner: Party,
        width: Width,
        values: &[u64],
    ) -> Self {
        let shares = values
            .iter()
            .map(|v| backend.from_plaintext(owner, width, *v))
            .collect();
        Self::from_shares(width, Layout::Batch(values.len()), shares)
    }

    /// Constructs a scalar value both parties already know in the clear, with no secret exchange
    /// (e.g. rule-window constants).
    pub fn constant(backend: &mut B, width: Width, value: u64) -> Self {
        let share = backend.constant(width, value);
        Self::from_shares(width, Layout::Scalar, vec![share])
    }

    /// Constructs a batch of values both parties already know in the clear.
    pub fn constant_batch(backend: &mut B, width: Width, values: &[u64]) -> Self {
        let shares = values.iter().map(|v| backend.constant(width, *v)).collect();
        Self::from_shares(width, Layout::Batch(values.len()), shares)
    }

    /// Constructs a scalar value directly from a pre-extracted share (§4.A constructor (b): used
    /// when input already arrived XOR-shared).
    pub fn from_share_bits(backend: &mut B, width: Width, share: u64) -> Self {
        let share = backend.from_share_bits(width, share);
        Self::from_shares(width, Layout::Scalar, vec![share])
    }

    /// Constructs a batch of values directly from pre-extracted shares.
    pub fn from_share_bits_batch(backend: &mut B, width: Width, shares: &[u64]) -> Self {
        let shares = shares
            .iter()
            .map(|s| backend.from_share_bits(width, *s))
            .collect();
        Self::from_shares(width, Layout::Batch(shares.len()), shares)
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.width != other.width {
            return Err(MeasurementError::ProtocolState(format!(
                "width mismatch: {:?} vs {:?}",
                self.width, other.width
            )));
        }
        if self.layout.len() != other.layout.len() {
            return Err(MeasurementError::ProtocolState(format!(
                "batch length mismatch: {} vs {}",
                self.layout.len(),
                other.layout.len()
            )));
        }
        Ok(())
    }

    fn zip_map(
        &self,
        other: &Self,
        backend: &mut B,
        mut op: impl FnMut(&mut B, Width, &B::Share, &B::Share) -> B::Share,
    ) -> Result<Self> {
        self.check_compatible(other)?;
        let shares = self
            .shares
            .iter()
            .zip(other.shares.iter())
            .map(|(a, b)| op(backend, self.width, a, b))
            .collect();
        Ok(Self::from_shares(self.width, self.layout, shares))
    }

    /// `self + other`, modular at this value's width, lane-wise.
    pub fn add(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.zip_map(other, backend, B::add)
    }

    /// `self - other`, modular at this value's width, lane-wise.
    pub fn sub(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.zip_map(other, backend, B::sub)
    }

    /// `self * other`, modular at this value's width, lane-wise.
    pub fn mul(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.zip_map(other, backend, B::mul)
    }

    /// `self == other`, lane-wise, each lane returned as a [`Width::Bit`] value.
    pub fn eq(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.check_compatible(other)?;
        let shares = self
            .shares
            .iter()
            .zip(other.shares.iter())
            .map(|(a, b)| backend.equal(self.width, a, b))
            .collect();
        Ok(Self::from_shares(Width::Bit, self.layout, shares))
    }

    /// `self < other` (unsigned), lane-wise, each lane returned as a [`Width::Bit`] value.
    pub fn lt(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.check_compatible(other)?;
        let shares = self
            .shares
            .iter()
            .zip(other.shares.iter())
            .map(|(a, b)| backend.less_than(self.width, a, b))
            .collect();
        Ok(Self::from_shares(Width::Bit, self.layout, shares))
    }

    /// `self <= other` (unsigned), i.e. `NOT(other < self)`.
    pub fn le(&self, other: &Self, backend: &mut B) -> Result<Self> {
        let gt = other.lt(self, backend)?;
        Ok(gt.not(backend))
    }

    /// `self & other`, bitwise, lane-wise.
    pub fn and(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.zip_map(other, backend, B::and)
    }

    /// `self | other`, bitwise, lane-wise.
    pub fn or(&self, other: &Self, backend: &mut B) -> Result<Self> {
        self.zip_map(other, backend, B::or)
    }

    /// `!self`, bitwise, lane-wise.
    pub fn not(&self, backend: &mut B) -> Self {
        let shares = self.shares.iter().map(|a| backend.not(self.width, a)).collect();
        Self::from_shares(self.width, self.layout, shares)
    }

    /// `cond ? on_true : on_false`, lane-wise, in one gate layer per lane (§4.A). `self` is the
    /// condition and must be [`Width::Bit`]-typed.
    pub fn mux(&self, on_false: &Self, on_true: &Self, backend: &mut B) -> Result<Self> {
        if self.width != Width::Bit {
            return Err(MeasurementError::ProtocolState(
                "mux condition must be a Bit value".to_string(),
            ));
        }
        on_false.check_compatible(on_true)?;
        if self.layout.len() != on_false.layout.len() {
            return Err(MeasurementError::ProtocolState(format!(
                "mux condition batch length {} does not match operand length {}",
                self.layout.len(),
                on_false.layout.len()
            )));
        }
        let shares = self
            .shares
            .iter()
            .zip(on_false.shares.iter())
            .zip(on_true.shares.iter())
            .map(|((c, a), b)| backend.mux(on_false.width, c, a, b))
            .collect();
        Ok(Self::from_shares(on_false.width, on_false.layout, shares))
    }

    /// Reveals this value to `party`. Scalar only; see [`SecValue::open_to_party_batch`] for
    /// batched values.
    pub fn open_to_party(&self, party: Party, backend: &mut B) -> Result<u64> {
        if self.shares.len() != 1 {
            return Err(MeasurementError::ProtocolState(
                "open_to_party called on a batched value; use open_to_party_batch".to_string(),
            ));
        }
        Ok(backend.open_to_party(party, self.width, &self.shares[0])?)
    }

    /// Reveals every lane of this value to `party` (§4.A batched reveal).
    pub fn open_to_party_batch(&self, party: Party, backend: &mut B) -> Result<Vec<u64>> {
        Ok(backend.open_to_party_batch(party, self.width, &self.shares)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBackend;

    #[test]
    fn scalar_add_reveals_correctly_to_both_parties() {
        let mut publisher = LocalBackend::new_publisher();
        let mut partner = LocalBackend::new_partner();

        let a = SecValue::from_plaintext(&mut publisher, Party::Publisher, Width::U32, 7);
        let b = SecValue::from_plaintext(&mut publisher, Party::Publisher, Width::U32, 5);
        let sum = a.add(&b, &mut publisher).unwrap();
        assert_eq!(sum.open_to_party(Party::Publisher, &mut publisher).unwrap(), 12);

        // mirror the computation on the partner's instance to exercise the "zero on the other
        // side" contract independently.
        let a2 = SecValue::from_plaintext(&mut partner, Party::Publisher, Width::U32, 7);
        let b2 = SecValue::from_plaintext(&mut partner, Party::Publisher, Width::U32, 5);
        let sum2 = a2.add(&b2, &mut partner).unwrap();
        assert_eq!(sum2.open_to_party(Party::Publisher, &mut partner).unwrap(), 0);
    }

    #[test]
    fn mux_selects_true_branch_when_condition_is_one() {
        let mut backend = LocalBackend::new_publisher();
        let cond = SecValue::from_plaintext(&mut backend, Party::Publisher, Width::Bit, 1);
        let on_false = SecValue::from_plaintext(&mut backend, Party::Publisher, Width::U32, 10);
        let on_true = SecValue::from_plaintext(&mut backend, Party::Publisher, Width::U32, 20);
        let selected = cond.mux(&on_false, &on_true, &mut backend).unwrap();
        assert_eq!(
            selected.open_to_party(Party::Publisher, &mut backend).unwrap(),
            20
        );
    }

    #[test]
    fn batch_width_mismatch_is_protocol_state_error() {
        let mut backend = LocalBackend::new_publisher();
        let a = SecValue::from_plaintext(&mut backend, Party::Publisher, Width::U32, 1);
        let b = SecValue::from_plaintext(&mut backend, Party::Publisher, Width::U16, 1);
        assert!(matches!(
            a.add(&b, &mut backend),
            Err(MeasurementError::ProtocolState(_))
        ));
    }
}
