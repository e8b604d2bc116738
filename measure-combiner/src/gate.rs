//! The k-anonymity threshold gate (§4.G "Threshold gate (lift only)").

use std::collections::BTreeMap;

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::combiner::MetricNode;
use measure_types::{MeasurementError, Result};

/// The publicly known sentinel written into any scalar leaf that fails the threshold gate.
pub const SENTINEL: i64 = -1;

const EXEMPT_KEYS: [&str; 2] = ["testPopulation", "controlPopulation"];

/// Applies the k-anonymity threshold gate to an already-combined grouped-lift tree: independently
/// to the overall `metrics` entry and to every `cohortMetrics`/`publisherBreakdowns` entry (§4.G:
/// "applied uniformly to overall metrics, each cohort, and each breakdown independently").
pub fn gate_grouped_lift_tree<B: SecureBackend>(
    tree: &MetricNode,
    threshold: i64,
    backend: &mut B,
) -> Result<MetricNode> {
    let dict = tree.as_dict()?;
    let metrics = dict
        .get("metrics")
        .ok_or_else(|| MeasurementError::Schema("grouped-lift tree missing 'metrics'".to_string()))?;
    let cohort_metrics = dict.get("cohortMetrics").and_then(|n| n.as_list().ok()).ok_or_else(|| {
        MeasurementError::Schema("grouped-lift tree missing 'cohortMetrics' list".to_string())
    })?;
    let publisher_breakdowns = dict.get("publisherBreakdowns").and_then(|n| n.as_list().ok()).ok_or_else(|| {
        MeasurementError::Schema("grouped-lift tree missing 'publisherBreakdowns' list".to_string())
    })?;

    let gated_metrics = gate_metrics_leaf(metrics, threshold, backend)?;
    let gated_cohorts = cohort_metrics
        .iter()
        .map(|leaf| gate_metrics_leaf(leaf, threshold, backend))
        .collect::<Result<Vec<_>>>()?;
    let gated_breakdowns = publisher_breakdowns
        .iter()
        .map(|leaf| gate_metrics_leaf(leaf, threshold, backend))
        .collect::<Result<Vec<_>>>()?;

    let mut out = BTreeMap::new();
    out.insert("metrics".to_string(), gated_metrics);
    out.insert("cohortMetrics".to_string(), MetricNode::List(gated_cohorts));
    out.insert("publisherBreakdowns".to_string(), MetricNode::List(gated_breakdowns));
    Ok(MetricNode::Dict(out))
}

/// Gates one `LiftMetrics`-shaped leaf dict.
fn gate_metrics_leaf<B: SecureBackend>(
    leaf: &MetricNode,
    threshold: i64,
    backend: &mut B,
) -> Result<MetricNode> {
    let dict = leaf.as_dict()?;
    let test_converters = dict
        .get("testConverters")
        .ok_or_else(|| MeasurementError::Schema("lift metrics leaf missing 'testConverters'".to_string()))?
        .as_value()?;
    let control_converters = dict
        .get("controlConverters")
        .ok_or_else(|| MeasurementError::Schema("lift metrics leaf missing 'controlConverters'".to_string()))?
        .as_value()?;

    let sum = SecValue::constant(backend, Width::U64, test_converters as u64)
        .add(&SecValue::constant(backend, Width::U64, control_converters as u64), backend)?;
    let t = SecValue::constant(backend, Width::U64, threshold as u64);
    let pass = t.le(&sum, backend)?;

    let mut gated = BTreeMap::new();
    for (key, node) in dict {
        if EXEMPT_KEYS.contains(&key.as_str()) {
            gated.insert(key.clone(), node.clone());
        } else {
            gated.insert(key.clone(), gate_node(node, &pass, backend)?);
        }
    }
    Ok(MetricNode::Dict(gated))
}

fn gate_node<B: SecureBackend>(
    node: &MetricNode,
    pass: &SecValue<B>,
    backend: &mut B,
) -> Result<MetricNode> {
    match node {
        MetricNode::Value(v) => {
            let value = SecValue::constant(backend, Width::U64, *v as u64);
            let sentinel = SecValue::constant(backend, Width::U64, SENTINEL as u64);
            let selected = pass.mux(&sentinel, &value, backend)?;
            // Materializes the gated share back into tree form; this is not the visibility reveal
            // (that happens per [`crate::reveal::reveal_tree`]) — opening to one's own party never
            // leaks anything beyond what this process already computed.
            Ok(MetricNode::Value(selected.open_to_party(backend.party(), backend)? as i64))
        }
        MetricNode::List(items) => {
            let gated = items
                .iter()
                .map(|n| gate_node(n, pass, backend))
                .collect::<Result<Vec<_>>>()?;
            Ok(MetricNode::List(gated))
        }
        MetricNode::Dict(map) => {
            let gated = map
                .iter()
                .map(|(k, n)| Ok((k.clone(), gate_node(n, pass, backend)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(MetricNode::Dict(gated))
        }
    }
}
