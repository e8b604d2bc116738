//! The oblivious bucketing primitive (§4.E "Oblivious bucketing", "Batching", "Reveal").
//!
//! This crate does not implement a real sublinear ORAM (§1 Non-goals: "No implementation of
//! oblivious primitives") — [`LocalObliviousStore`] gets the *externally observable* contract
//! right (every write touches every slot, so the access pattern never depends on which index was
//! written) via a linear scan, standing in for whatever sublinear oblivious-RAM library a real
//! deployment links against behind the [`ObliviousWrite`]/[`ObliviousStore`] seam.

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::{MeasurementError, Party, Result};

/// Accepts oblivious additive writes of `(index, convs, value)` triples.
pub trait ObliviousWrite<B: SecureBackend> {
    /// The maximum number of writes this store's backing primitive accepts in one batch before
    /// the caller must split (§4.E "Batching").
    fn max_batch_size(&self) -> usize;

    /// Adds `convs` to slot `index`'s running conversion count and `value` to its running value
    /// sum. Repeated writes to the same secret index accumulate (§4.E: "the ORAM guarantees
    /// addition semantics").
    fn write(
        &mut self,
        index: &SecValue<B>,
        convs: &SecValue<B>,
        value: &SecValue<B>,
        backend: &mut B,
    ) -> Result<()>;

    /// Writes a whole batch, splitting into [`ObliviousWrite::max_batch_size`]-sized chunks
    /// (§4.E "Batching").
    fn write_batch(
        &mut self,
        writes: &[(SecValue<B>, SecValue<B>, SecValue<B>)],
        backend: &mut B,
    ) -> Result<()> {
        let batch_size = self.max_batch_size();
        if batch_size == 0 {
            return Err(MeasurementError::Capacity(
                "oblivious store declares a max batch size of 0".to_string(),
            ));
        }
        for chunk in writes.chunks(batch_size) {
            for (index, convs, value) in chunk {
                self.write(index, convs, value, backend)?;
            }
        }
        Ok(())
    }
}

/// Reveals accumulated slots, either to a single party or by re-summing both parties' shares
/// in MPC (§4.E "Reveal").
pub trait ObliviousStore<B: SecureBackend>: ObliviousWrite<B> {
    /// Reveals slot `index`'s `(convs, value)` directly to `party` (the publisher-only reveal
    /// path).
    fn public_read(&mut self, index: usize, party: Party, backend: &mut B) -> Result<(u32, u32)>;

    /// Returns slot `index`'s `(convs, value)` still secret-shared, for the "re-enter both
    /// parties' shares into MPC and sum" reveal path.
    fn secret_read(&mut self, index: usize, backend: &mut B) -> Result<(SecValue<B>, SecValue<B>)>;

    /// The number of addressable slots, `N + 1` (slot `0` unused, §4.E "size `N+1`").
    fn len(&self) -> usize;

    /// Whether this store has no addressable slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single-process [`ObliviousStore`] over `n + 1` slots (slot `0` reserved, unused).
pub struct LocalObliviousStore<B: SecureBackend> {
    convs: Vec<SecValue<B>>,
    values: Vec<SecValue<B>>,
    max_batch_size: usize,
}

impl<B: SecureBackend> LocalObliviousStore<B> {
    /// Builds a store with `n + 1` slots, all zeroed, backed by `backend`.
    pub fn new(backend: &mut B, n: usize, max_batch_size: usize) -> Self {
        let convs = (0..=n).map(|_| SecValue::constant(backend, Width::U32, 0)).collect();
        let values = (0..=n).map(|_| SecValue::constant(backend, Width::U32, 0)).collect();
        Self {
            convs,
            values,
            max_batch_size,
        }
    }
}

impl<B: SecureBackend> ObliviousWrite<B> for LocalObliviousStore<B> {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn write(
        &mut self,
        index: &SecValue<B>,
        convs: &SecValue<B>,
        value: &SecValue<B>,
        backend: &mut B,
    ) -> Result<()> {
        for (slot, (slot_convs, slot_value)) in self.convs.iter_mut().zip(self.values.iter_mut()).enumerate() {
            let slot_id = SecValue::constant(backend, index.width(), slot as u64);
            let is_target = index.eq(&slot_id, backend)?;
            let masked_convs = is_target.mux(
                &SecValue::constant(backend, Width::U32, 0),
                convs,
                backend,
            )?;
            let masked_value = is_target.mux(
                &SecValue::constant(backend, Width::U32, 0),
                value,
                backend,
            )?;
            *slot_convs = slot_convs.add(&masked_convs, backend)?;
            *slot_value = slot_value.add(&masked_value, backend)?;
        }
        Ok(())
    }
}

impl<B: SecureBackend> ObliviousStore<B> for LocalObliviousStore<B> {
    fn public_read(&mut self, index: usize, party: Party, backend: &mut B) -> Result<(u32, u32)> {
        let convs = self.convs[index].open_to_party(party, backend)? as u32;
        let value = self.values[index].open_to_party(party, backend)? as u32;
        Ok((convs, value))
    }

    fn secret_read(&mut self, index: usize, _backend: &mut B) -> Result<(SecValue<B>, SecValue<B>)> {
        Ok((self.convs[index].clone(), self.values[index].clone()))
    }

    fn len(&self) -> usize {
        self.convs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_core::local::LocalBackend;

    #[test]
    fn repeated_writes_to_same_index_sum_in_place() {
        let mut backend = LocalBackend::new_publisher();
        let mut store = LocalObliviousStore::new(&mut backend, 4, 128);

        let idx = SecValue::constant(&mut backend, Width::U16, 2);
        let one_conv = SecValue::constant(&mut backend, Width::U32, 1);
        let value_a = SecValue::constant(&mut backend, Width::U32, 10);
        let value_b = SecValue::constant(&mut backend, Width::U32, 5);

        store.write(&idx, &one_conv, &value_a, &mut backend).unwrap();
        store.write(&idx, &one_conv, &value_b, &mut backend).unwrap();

        let (convs, value) = store.public_read(2, Party::Publisher, &mut backend).unwrap();
        assert_eq!(convs, 2);
        assert_eq!(value, 15);
    }

    #[test]
    fn writes_do_not_leak_into_other_slots() {
        let mut backend = LocalBackend::new_publisher();
        let mut store = LocalObliviousStore::new(&mut backend, 4, 128);

        let idx = SecValue::constant(&mut backend, Width::U16, 3);
        let one_conv = SecValue::constant(&mut backend, Width::U32, 1);
        let value = SecValue::constant(&mut backend, Width::U32, 7);
        store.write(&idx, &one_conv, &value, &mut backend).unwrap();

        for slot in [0usize, 1, 2, 4] {
            let (convs, v) = store.public_read(slot, Party::Publisher, &mut backend).unwrap();
            assert_eq!((convs, v), (0, 0));
        }
        let (convs, v) = store.public_read(3, Party::Publisher, &mut backend).unwrap();
        assert_eq!((convs, v), (1, 7));
    }

    #[test]
    fn zero_max_batch_size_is_a_capacity_error() {
        let mut backend = LocalBackend::new_publisher();
        let mut store = LocalObliviousStore::new(&mut backend, 4, 0);
        let idx = SecValue::constant(&mut backend, Width::U16, 1);
        let one = SecValue::constant(&mut backend, Width::U32, 1);
        assert!(store.write_batch(&[(idx, one.clone(), one)], &mut backend).is_err());
    }
}
