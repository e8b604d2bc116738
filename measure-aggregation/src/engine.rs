//! Aggregation orchestration (§4.E): fold attribution outcomes into the oblivious store, then
//! reveal.
//!
//! Per-touchpoint attribution isn't tracked explicitly here. §4.E describes folding
//! `attributedAtI` (an OR over conversions of "conversion `c` was attributed to touchpoint `i`")
//! into a per-touchpoint value sum, then writing `(compressedAdId, attributedBit,
//! attributedBit*convValue)` once per `(touchpoint, conversion)` pair. Since the reverse-scan
//! engine already guarantees at most one touchpoint wins per conversion
//! (`measure_attribution::AttributionOutcome`), every non-winning touchpoint would write a zero
//! triple; one write per *conversion*, keyed by that conversion's `winner_ad_id`, is the same sum
//! with the zero writes elided.

use measure_attribution::AttributionOutcome;
use measure_core::{SecValue, SecureBackend, Width};
use measure_types::aggregation::{AdTotals, AggregationResult, CompressedAdIdMap};
use measure_types::{Party, Result, Visibility};

use crate::oram::ObliviousStore;

/// Folds every conversion's attribution outcome into `store`, keyed by its winning compressed ad
/// id (§4.E "Oblivious bucketing"). `conv_values` holds each conversion's (secret) value, in the
/// same order as `outcomes`.
pub fn aggregate<B: SecureBackend, S: ObliviousStore<B>>(
    store: &mut S,
    outcomes: &[AttributionOutcome<B>],
    conv_values: &[SecValue<B>],
    backend: &mut B,
) -> Result<()> {
    let zero = SecValue::constant(backend, Width::U32, 0);
    let one = SecValue::constant(backend, Width::U32, 1);

    for (outcome, conv_value) in outcomes.iter().zip(conv_values.iter()) {
        let convs_contribution = outcome.is_attributed.mux(&zero, &one, backend)?;
        let value_contribution = outcome.is_attributed.mux(&zero, conv_value, backend)?;
        store.write(&outcome.winner_ad_id, &convs_contribution, &value_contribution, backend)?;
    }
    Ok(())
}

/// Reveals every compressed ad id's accumulated `(convs, value)` totals, keyed back to the
/// original ad id via `mapping` (§4.E "Reveal").
///
/// `Visibility::Public`/`Visibility::Publisher` take the cheap publisher-only read path;
/// `Visibility::Partner` mirrors it for the partner; `Visibility::None` takes the
/// secret-read-and-resum path, opened locally to whichever party `backend` represents (a real
/// two-party deployment re-enters both parties' shares into MPC before this final open).
pub fn reveal<B: SecureBackend, S: ObliviousStore<B>>(
    store: &mut S,
    mapping: &CompressedAdIdMap,
    visibility: Visibility,
    backend: &mut B,
) -> Result<AggregationResult> {
    let mut result = AggregationResult::new();
    for compressed in 1..store.len() {
        let Some(original) = mapping.original_of(compressed as u16) else {
            continue;
        };
        let (convs, value) = match visibility {
            Visibility::Public | Visibility::Publisher => {
                store.public_read(compressed, Party::Publisher, backend)?
            }
            Visibility::Partner => store.public_read(compressed, Party::Partner, backend)?,
            Visibility::None => {
                let (convs_secret, value_secret) = store.secret_read(compressed, backend)?;
                let party = backend.party();
                let convs = convs_secret.open_to_party(party, backend)? as u32;
                let value = value_secret.open_to_party(party, backend)? as u32;
                (convs, value)
            }
        };
        result.insert(original, AdTotals { convs, value });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_attribution::{attribute_reverse_scan, rules::LastClick1d, SecConversion, SecTouchpoint};
    use measure_core::local::LocalBackend;
    use measure_types::{Conversion, Touchpoint};

    use crate::compress::compress_ad_ids_across_users;
    use crate::oram::LocalObliviousStore;

    #[test]
    fn end_to_end_single_rule_two_ads() {
        let mut backend = LocalBackend::new_publisher();

        let users = vec![vec![
            Touchpoint {
                id: 0,
                is_click: true,
                ts: 100,
                ad_id: 17,
                ad_id_compressed: 0,
                target_id: 0,
                action_type: 0,
                campaign_metadata: 0,
            },
            Touchpoint {
                id: 1,
                is_click: true,
                ts: 300,
                ad_id: 42,
                ad_id_compressed: 0,
                target_id: 0,
                action_type: 0,
                campaign_metadata: 0,
            },
        ]];
        let compressed = compress_ad_ids_across_users(users).unwrap();
        let row = &compressed.relabeled_users[0];

        let sec_touchpoints: Vec<_> = row
            .iter()
            .map(|tp| SecTouchpoint::from_plaintext(&mut backend, Party::Publisher, tp))
            .collect();
        let conv = Conversion {
            ts: 350,
            conv_value: 20,
            target_id: 0,
            action_type: 0,
            conv_metadata: 0,
        };
        let sec_conversions = vec![SecConversion::from_plaintext(&mut backend, Party::Publisher, &conv)];

        let outcomes =
            attribute_reverse_scan(&LastClick1d, &sec_touchpoints, &sec_conversions, &mut backend).unwrap();
        let conv_values = vec![SecValue::from_plaintext(
            &mut backend,
            Party::Publisher,
            Width::U32,
            conv.conv_value as u64,
        )];

        let mut store = LocalObliviousStore::new(&mut backend, 2, 128);
        aggregate(&mut store, &outcomes, &conv_values, &mut backend).unwrap();
        let result = reveal(&mut store, &compressed.mapping, Visibility::Public, &mut backend).unwrap();

        assert_eq!(result[&42].convs, 1);
        assert_eq!(result[&42].value, 20);
        assert_eq!(result[&17].convs, 0);
        assert_eq!(result[&17].value, 0);
    }
}
