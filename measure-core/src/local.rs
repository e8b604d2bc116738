//! [`LocalBackend`]: a single-process implementation of [`SecureBackend`] for tests and demos.
//!
//! It represents every share as an additive pair `(s0, s1)` with `combined = (s0 + s1) mod
//! 2^width`, re-randomized on every operation. This gives the rest of the system something
//! genuinely computable to run against without depending on a real MPC runtime — exactly the role
//! `oprf-core`'s in-process helpers play relative to `oprf-service`'s networked protocol. It is
//! **not** privacy-preserving: a [`LocalBackend`] instance always has enough information to
//! compute the true result locally. Its only enforced privacy behavior is the one the rest of the
//! system actually depends on for correctness: [`SecureBackend::open_to_party`] returns zero when
//! asked to reveal to a party other than the one this instance represents.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use measure_types::Party;

use crate::backend::{BackendResult, SecureBackend};
use crate::width::Width;

/// An additive two-way split of a value modulo `2^width`.
pub type Share = (u64, u64);

/// A single-process mock [`SecureBackend`] (see module docs).
pub struct LocalBackend {
    party: Party,
    rng: ChaCha8Rng,
}

impl LocalBackend {
    /// Builds an instance acting as `party`, seeded from OS entropy.
    pub fn new(party: Party) -> Self {
        Self {
            party,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Convenience constructor for a publisher-side instance.
    pub fn new_publisher() -> Self {
        Self::new(Party::Publisher)
    }

    /// Convenience constructor for a partner-side instance.
    pub fn new_partner() -> Self {
        Self::new(Party::Partner)
    }

    /// Builds a deterministic instance for reproducible tests.
    pub fn with_seed(party: Party, seed: u64) -> Self {
        Self {
            party,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn combined(&self, width: Width, share: &Share) -> u64 {
        width.truncate(share.0.wrapping_add(share.1))
    }

    fn reshare(&mut self, width: Width, combined: u64) -> Share {
        let combined = width.truncate(combined);
        let s0 = self.rng.r#gen::<u64>() & width.mask();
        let s1 = width.truncate(combined.wrapping_sub(s0));
        (s0, s1)
    }
}

impl SecureBackend for LocalBackend {
    type Share = Share;

    fn party(&self) -> Party {
        self.party
    }

    fn from_plaintext(&mut self, _owner: Party, width: Width, value: u64) -> Self::Share {
        self.reshare(width, value)
    }

    fn constant(&mut self, width: Width, value: u64) -> Self::Share {
        self.reshare(width, value)
    }

    fn from_share_bits(&mut self, width: Width, share: u64) -> Self::Share {
        // A pre-extracted share arrives as this party's half of the split; the other half is
        // implicitly zero until combined with the peer's own `from_share_bits` call on their
        // instance (a real two-party run exchanges these over the wire; here there is no peer to
        // exchange with, so we model "my share" directly).
        (width.truncate(share), 0)
    }

    fn add(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let sum = self.combined(width, a).wrapping_add(self.combined(width, b));
        self.reshare(width, sum)
    }

    fn sub(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let diff = self.combined(width, a).wrapping_sub(self.combined(width, b));
        self.reshare(width, diff)
    }

    fn mul(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let product = self.combined(width, a).wrapping_mul(self.combined(width, b));
        self.reshare(width, product)
    }

    fn equal(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let eq = (self.combined(width, a) == self.combined(width, b)) as u64;
        self.reshare(Width::Bit, eq)
    }

    fn less_than(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let lt = (self.combined(width, a) < self.combined(width, b)) as u64;
        self.reshare(Width::Bit, lt)
    }

    fn and(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let v = self.combined(width, a) & self.combined(width, b);
        self.reshare(width, v)
    }

    fn or(&mut self, width: Width, a: &Self::Share, b: &Self::Share) -> Self::Share {
        let v = self.combined(width, a) | self.combined(width, b);
        self.reshare(width, v)
    }

    fn not(&mut self, width: Width, a: &Self::Share) -> Self::Share {
        let v = !self.combined(width, a) & width.mask();
        self.reshare(width, v)
    }

    fn mux(
        &mut self,
        width: Width,
        cond: &Self::Share,
        a: &Self::Share,
        b: &Self::Share,
    ) -> Self::Share {
        let cond = self.combined(Width::Bit, cond);
        let selected = if cond == 1 {
            self.combined(width, b)
        } else {
            self.combined(width, a)
        };
        self.reshare(width, selected)
    }

    fn open_to_party(&mut self, party: Party, width: Width, value: &Self::Share) -> BackendResult<u64> {
        if party == self.party {
            Ok(self.combined(width, value))
        } else {
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_to_other_party_yields_zero() {
        let mut backend = LocalBackend::with_seed(Party::Publisher, 1);
        let share = backend.from_plaintext(Party::Publisher, Width::U32, 42);
        assert_eq!(
            backend.open_to_party(Party::Publisher, Width::U32, &share).unwrap(),
            42
        );
        assert_eq!(
            backend.open_to_party(Party::Partner, Width::U32, &share).unwrap(),
            0
        );
    }

    #[test]
    fn arithmetic_is_modular_at_width() {
        let mut backend = LocalBackend::with_seed(Party::Publisher, 2);
        let a = backend.from_plaintext(Party::Publisher, Width::U16, 0xFFFF);
        let one = backend.from_plaintext(Party::Publisher, Width::U16, 1);
        let wrapped = backend.add(Width::U16, &a, &one);
        assert_eq!(
            backend.open_to_party(Party::Publisher, Width::U16, &wrapped).unwrap(),
            0
        );
    }

    #[test]
    fn mul_is_modular_at_width() {
        let mut backend = LocalBackend::with_seed(Party::Publisher, 4);
        let a = backend.from_plaintext(Party::Publisher, Width::U16, 300);
        let b = backend.from_plaintext(Party::Publisher, Width::U16, 300);
        let product = backend.mul(Width::U16, &a, &b);
        assert_eq!(
            backend.open_to_party(Party::Publisher, Width::U16, &product).unwrap(),
            (300u64 * 300) % (1u64 << 16)
        );
    }

    #[test]
    fn mux_picks_branch_by_condition() {
        let mut backend = LocalBackend::with_seed(Party::Publisher, 3);
        let zero = backend.from_plaintext(Party::Publisher, Width::Bit, 0);
        let one = backend.from_plaintext(Party::Publisher, Width::Bit, 1);
        let a = backend.from_plaintext(Party::Publisher, Width::U32, 10);
        let b = backend.from_plaintext(Party::Publisher, Width::U32, 20);
        let pick_a = backend.mux(Width::U32, &zero, &a, &b);
        let pick_b = backend.mux(Width::U32, &one, &a, &b);
        assert_eq!(
            backend.open_to_party(Party::Publisher, Width::U32, &pick_a).unwrap(),
            10
        );
        assert_eq!(
            backend.open_to_party(Party::Publisher, Width::U32, &pick_b).unwrap(),
            20
        );
    }
}
