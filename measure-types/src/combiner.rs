//! The shard-combiner metric tree: a duck-typed sum type, not inheritance (§4.G, §9).
//!
//! Implemented as a tagged enum; every traversal is a match on the tag, per §9's "Duck-typed
//! metrics tree" design note.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MeasurementError, Result};

/// A node in the shard-combiner metric tree.
///
/// `Dict` uses a [`BTreeMap`] rather than an order-preserving map: key order is not
/// observable by any operation this spec defines (sum, schema check, threshold gate all act
/// per-key), so the simpler, deterministically-ordered map is preferred over carrying insertion
/// order through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricNode {
    /// A scalar leaf.
    Value(i64),
    /// An ordered, fixed-length list of nodes. List lengths at a given tree path must be
    /// identical across all shards of one run (§3 invariant).
    List(Vec<MetricNode>),
    /// A keyed map of nodes.
    Dict(BTreeMap<String, MetricNode>),
}

impl MetricNode {
    /// Structurally sums two matching trees (§4.G tree reduction):
    /// `Value+Value=Value`, `List+List` pairwise (equal lengths required), `Dict+Dict` keyed
    /// (keys present in only one side carried through unchanged, to support unions of ad ids).
    pub fn combine(&self, other: &MetricNode) -> Result<MetricNode> {
        match (self, other) {
            (MetricNode::Value(a), MetricNode::Value(b)) => Ok(MetricNode::Value(a + b)),
            (MetricNode::List(a), MetricNode::List(b)) => {
                if a.len() != b.len() {
                    return Err(MeasurementError::Schema(format!(
                        "shard combiner list length mismatch: {} vs {}",
                        a.len(),
                        b.len()
                    )));
                }
                let combined = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.combine(y))
                    .collect::<Result<Vec<_>>>()?;
                Ok(MetricNode::List(combined))
            }
            (MetricNode::Dict(a), MetricNode::Dict(b)) => {
                let mut out = BTreeMap::new();
                for key in a.keys().chain(b.keys()).collect::<std::collections::BTreeSet<_>>() {
                    let combined = match (a.get(key), b.get(key)) {
                        (Some(x), Some(y)) => x.combine(y)?,
                        (Some(x), None) => x.clone(),
                        (None, Some(y)) => y.clone(),
                        (None, None) => unreachable!("key came from one of the two maps"),
                    };
                    out.insert(key.clone(), combined);
                }
                Ok(MetricNode::Dict(out))
            }
            _ => Err(MeasurementError::Schema(
                "shard combiner tree shape mismatch between shards".to_string(),
            )),
        }
    }

    /// Returns the inner scalar, or a schema error if this node is not a [`MetricNode::Value`].
    pub fn as_value(&self) -> Result<i64> {
        match self {
            MetricNode::Value(v) => Ok(*v),
            _ => Err(MeasurementError::Schema(
                "expected a scalar leaf".to_string(),
            )),
        }
    }

    /// Returns the inner dict, or a schema error if this node is not a [`MetricNode::Dict`].
    pub fn as_dict(&self) -> Result<&BTreeMap<String, MetricNode>> {
        match self {
            MetricNode::Dict(d) => Ok(d),
            _ => Err(MeasurementError::Schema("expected a dict node".to_string())),
        }
    }

    /// Returns the inner list, or a schema error if this node is not a [`MetricNode::List`].
    pub fn as_list(&self) -> Result<&[MetricNode]> {
        match self {
            MetricNode::List(l) => Ok(l),
            _ => Err(MeasurementError::Schema("expected a list node".to_string())),
        }
    }
}

/// Which root schema a shard file must validate against (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardSchema {
    /// Root is a dict keyed by attribution-rule name; each value is `{"measurement": {adId:
    /// {convs, sales}}}`.
    AdObject,
    /// Root has exactly `metrics`, `cohortMetrics`, `publisherBreakdowns`.
    GroupedLift,
}

impl ShardSchema {
    /// Validates `root` against this schema, per §4.G's "Schema validation" rules. Returns an
    /// error naming the missing/mismatched key on failure.
    pub fn validate(self, root: &MetricNode) -> Result<()> {
        let dict = root.as_dict()?;
        match self {
            ShardSchema::AdObject => {
                for (rule_name, rule_node) in dict {
                    let rule_dict = rule_node.as_dict().map_err(|_| {
                        MeasurementError::Schema(format!(
                            "ad-object shard: rule '{rule_name}' value is not a dict"
                        ))
                    })?;
                    let measurement = rule_dict.get("measurement").ok_or_else(|| {
                        MeasurementError::Schema(format!(
                            "ad-object shard: rule '{rule_name}' missing 'measurement' key"
                        ))
                    })?;
                    let ad_entries = measurement.as_dict().map_err(|_| {
                        MeasurementError::Schema(format!(
                            "ad-object shard: rule '{rule_name}' measurement is not a dict"
                        ))
                    })?;
                    for (ad_id, totals) in ad_entries {
                        let totals_dict = totals.as_dict().map_err(|_| {
                            MeasurementError::Schema(format!(
                                "ad-object shard: ad '{ad_id}' totals is not a dict"
                            ))
                        })?;
                        for required in ["convs", "sales"] {
                            if !totals_dict.contains_key(required) {
                                return Err(MeasurementError::Schema(format!(
                                    "ad-object shard: ad '{ad_id}' missing '{required}'"
                                )));
                            }
                        }
                    }
                }
                Ok(())
            }
            ShardSchema::GroupedLift => {
                for required in ["metrics", "cohortMetrics", "publisherBreakdowns"] {
                    if !dict.contains_key(required) {
                        return Err(MeasurementError::Schema(format!(
                            "grouped-lift shard missing required key '{required}'"
                        )));
                    }
                }
                if !matches!(dict["metrics"], MetricNode::Dict(_)) {
                    return Err(MeasurementError::Schema(
                        "grouped-lift shard: 'metrics' is not a dict".to_string(),
                    ));
                }
                for list_key in ["cohortMetrics", "publisherBreakdowns"] {
                    if !matches!(dict[list_key], MetricNode::List(_)) {
                        return Err(MeasurementError::Schema(format!(
                            "grouped-lift shard: '{list_key}' is not a list"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: Vec<(&str, MetricNode)>) -> MetricNode {
        MetricNode::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn combine_sums_values_pairwise_lists_and_union_dicts() {
        let a = dict(vec![
            ("A", dict(vec![("convs", MetricNode::Value(3))])),
            ("shared", MetricNode::List(vec![MetricNode::Value(1), MetricNode::Value(2)])),
        ]);
        let b = dict(vec![
            ("B", dict(vec![("convs", MetricNode::Value(5))])),
            ("shared", MetricNode::List(vec![MetricNode::Value(10), MetricNode::Value(20)])),
        ]);
        let combined = a.combine(&b).unwrap();
        let d = combined.as_dict().unwrap();
        assert_eq!(d["A"].as_dict().unwrap()["convs"].as_value().unwrap(), 3);
        assert_eq!(d["B"].as_dict().unwrap()["convs"].as_value().unwrap(), 5);
        assert_eq!(
            d["shared"].as_list().unwrap(),
            &[MetricNode::Value(11), MetricNode::Value(22)]
        );
    }

    #[test]
    fn combine_rejects_mismatched_list_lengths() {
        let a = MetricNode::List(vec![MetricNode::Value(1)]);
        let b = MetricNode::List(vec![MetricNode::Value(1), MetricNode::Value(2)]);
        assert!(a.combine(&b).is_err());
    }

    #[test]
    fn combine_rejects_shape_mismatch() {
        let a = MetricNode::Value(1);
        let b = MetricNode::List(vec![]);
        assert!(a.combine(&b).is_err());
    }

    #[test]
    fn ad_object_schema_scenario_5_two_disjoint_shards() {
        let shard_a = dict(vec![(
            "last_click_1d",
            dict(vec![(
                "measurement",
                dict(vec![(
                    "A",
                    dict(vec![
                        ("convs", MetricNode::Value(3)),
                        ("sales", MetricNode::Value(30)),
                    ]),
                )]),
            )]),
        )]);
        let shard_b = dict(vec![(
            "last_click_1d",
            dict(vec![(
                "measurement",
                dict(vec![(
                    "B",
                    dict(vec![
                        ("convs", MetricNode::Value(5)),
                        ("sales", MetricNode::Value(50)),
                    ]),
                )]),
            )]),
        )]);
        ShardSchema::AdObject.validate(&shard_a).unwrap();
        ShardSchema::AdObject.validate(&shard_b).unwrap();
        let combined = shard_a.combine(&shard_b).unwrap();
        let measurement = combined.as_dict().unwrap()["last_click_1d"]
            .as_dict()
            .unwrap()["measurement"]
            .as_dict()
            .unwrap();
        assert_eq!(measurement["A"].as_dict().unwrap()["convs"].as_value().unwrap(), 3);
        assert_eq!(measurement["B"].as_dict().unwrap()["sales"].as_value().unwrap(), 50);
    }

    #[test]
    fn grouped_lift_schema_requires_publisher_breakdowns() {
        let missing = dict(vec![
            ("metrics", dict(vec![])),
            ("cohortMetrics", MetricNode::List(vec![])),
        ]);
        assert!(ShardSchema::GroupedLift.validate(&missing).is_err());

        let complete = dict(vec![
            ("metrics", dict(vec![])),
            ("cohortMetrics", MetricNode::List(vec![])),
            ("publisherBreakdowns", MetricNode::List(vec![])),
        ]);
        ShardSchema::GroupedLift.validate(&complete).unwrap();
    }
}
