//! Aggregation result and compressed ad-id sidecar (§4.E, §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MeasurementError, Result};

/// The largest compressed-ad-id space representable in 16 bits with `0` reserved for "no ad"
/// (§3 invariant: compressed adId width ≤ 16 bits ⇒ N ≤ 65536).
pub const MAX_COMPRESSED_AD_IDS: usize = u16::MAX as usize;

/// Per-ad attributed totals (§3: `Aggregation result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdTotals {
    /// Number of attributed conversions credited to this ad.
    pub convs: u32,
    /// Sum of attributed conversion values credited to this ad (wire field name `sales`, §6).
    #[serde(rename = "sales")]
    pub value: u32,
}

impl AdTotals {
    /// Folds a single (attributed bit, conversion value) pair into this ad's running totals.
    pub fn add(&mut self, attributed: bool, conv_value: u32) {
        if attributed {
            self.convs += 1;
            self.value += conv_value;
        }
    }
}

/// `originalAdId -> totals`, keyed by the *original* (uncompressed) ad id per §3. Ads never seen
/// are absent (not present with zero totals) unless they were touched (seen even if
/// unattributed, scenario 3 of §8).
pub type AggregationResult = BTreeMap<u64, AdTotals>;

/// Maps a single rule's aggregation result into the `{"measurement": {...}}` wire shape of §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementAggregate {
    /// `originalAdId (as string) -> totals`.
    pub measurement: BTreeMap<String, AdTotals>,
}

impl MeasurementAggregate {
    /// Builds the wire representation from an [`AggregationResult`].
    pub fn from_result(result: &AggregationResult) -> Self {
        Self {
            measurement: result
                .iter()
                .map(|(ad_id, totals)| (ad_id.to_string(), *totals))
                .collect(),
        }
    }
}

/// The compressed-ad-id sidecar file written next to attribution output (§4.E step 3, §6):
/// `{"<compressed-id-as-string>": <original-u64>}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressedAdIdMap {
    /// `compressedId (as string) -> originalAdId`.
    #[serde(flatten)]
    pub mapping: BTreeMap<String, u64>,
}

impl CompressedAdIdMap {
    /// Builds the sidecar from a `compressed -> original` mapping, keyed `1..=N`.
    pub fn from_compressed(compressed_to_original: &BTreeMap<u16, u64>) -> Self {
        Self {
            mapping: compressed_to_original
                .iter()
                .map(|(compressed, original)| (compressed.to_string(), *original))
                .collect(),
        }
    }

    /// Looks up the original ad id for a compressed id, if present.
    pub fn original_of(&self, compressed: u16) -> Option<u64> {
        self.mapping.get(&compressed.to_string()).copied()
    }
}

/// Compresses a set of original ad ids into sequential 1-based ids (§4.E step 1-2).
///
/// `0` is reserved for "no ad" and is never assigned; distinct non-zero ids are sorted and
/// assigned `1..=N`. Fails with [`MeasurementError::Capacity`] if `N` would exceed
/// [`MAX_COMPRESSED_AD_IDS`].
pub fn compress_ad_ids(original_ad_ids: impl IntoIterator<Item = u64>) -> Result<BTreeMap<u64, u16>> {
    let mut distinct: Vec<u64> = original_ad_ids.into_iter().filter(|id| *id != 0).collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() > MAX_COMPRESSED_AD_IDS {
        return Err(MeasurementError::Capacity(format!(
            "{} distinct ad ids exceeds the 16-bit compressed id space ({} max)",
            distinct.len(),
            MAX_COMPRESSED_AD_IDS
        )));
    }
    Ok(distinct
        .into_iter()
        .enumerate()
        .map(|(idx, original)| (original, (idx + 1) as u16))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compresses_to_sequential_one_based_ids_sorted() {
        let mapping = compress_ad_ids([42, 17, 17, 5]).unwrap();
        assert_eq!(mapping.get(&5), Some(&1));
        assert_eq!(mapping.get(&17), Some(&2));
        assert_eq!(mapping.get(&42), Some(&3));
    }

    #[test]
    fn zero_ad_id_is_never_assigned_a_compressed_id() {
        let mapping = compress_ad_ids([0, 1]).unwrap();
        assert!(!mapping.contains_key(&0));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn fails_when_universe_exceeds_sixteen_bits() {
        let too_many = (1..=(MAX_COMPRESSED_AD_IDS as u64 + 1)).collect::<Vec<_>>();
        assert!(matches!(
            compress_ad_ids(too_many),
            Err(MeasurementError::Capacity(_))
        ));
    }

    #[test]
    fn sidecar_round_trips_through_json() {
        let mut compressed_to_original = BTreeMap::new();
        compressed_to_original.insert(1u16, 17u64);
        compressed_to_original.insert(2u16, 42u64);
        let sidecar = CompressedAdIdMap::from_compressed(&compressed_to_original);
        let json = serde_json::to_string(&sidecar).unwrap();
        let reloaded: CompressedAdIdMap = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.original_of(1), Some(17));
        assert_eq!(reloaded.original_of(2), Some(42));
    }

    #[test]
    fn aggregation_scenario_single_ad_two_users() {
        // §8 scenario 3: original ad ids {17, 42, 17}, attributed bits {1,0,1}, values {5,7,3}.
        let mapping = compress_ad_ids([17, 42, 17]).unwrap();
        assert_eq!(mapping.len(), 2);

        let mut result: AggregationResult = AggregationResult::new();
        result.entry(17).or_default().add(true, 5);
        result.entry(42).or_default();
        result.entry(17).or_default().add(true, 3);

        assert_eq!(result[&17].convs, 2);
        assert_eq!(result[&17].value, 8);
        assert_eq!(result[&42].convs, 0);
        assert_eq!(result[&42].value, 0);

        let wire = MeasurementAggregate::from_result(&result);
        assert_eq!(wire.measurement["17"].convs, 2);
        assert_eq!(wire.measurement["42"].value, 0);
    }
}
