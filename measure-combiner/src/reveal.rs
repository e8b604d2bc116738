//! Reveal to the configured visibility (§4.G "Reveal"): four modes, applied per-leaf; tree shape
//! itself is public.

use std::collections::BTreeMap;

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::combiner::MetricNode;
use measure_types::{Result, Visibility};

/// Reveals every scalar leaf of `tree`, recursing through its (public) shape.
pub fn reveal_tree<B: SecureBackend>(
    tree: &MetricNode,
    visibility: Visibility,
    backend: &mut B,
) -> Result<MetricNode> {
    match tree {
        MetricNode::Value(v) => Ok(MetricNode::Value(reveal_leaf(*v, visibility, backend)?)),
        MetricNode::List(items) => {
            let revealed = items
                .iter()
                .map(|n| reveal_tree(n, visibility, backend))
                .collect::<Result<Vec<_>>>()?;
            Ok(MetricNode::List(revealed))
        }
        MetricNode::Dict(map) => {
            let revealed = map
                .iter()
                .map(|(k, n)| Ok((k.clone(), reveal_tree(n, visibility, backend)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(MetricNode::Dict(revealed))
        }
    }
}

/// §4.G: "none" emits zeroed fields to the non-recipient; the other three modes open to whichever
/// party(ies) are entitled to see the plaintext.
fn reveal_leaf<B: SecureBackend>(value: i64, visibility: Visibility, backend: &mut B) -> Result<i64> {
    if visibility == Visibility::None {
        return Ok(0);
    }
    let party = backend.party();
    if !visibility.party_may_see(party) {
        return Ok(0);
    }
    let share = SecValue::constant(backend, Width::U64, value as u64);
    Ok(share.open_to_party(party, backend)? as i64)
}
