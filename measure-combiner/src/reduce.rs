//! Sequential-pairwise tree reduction across shards (§4.G "Tree reduction").

use measure_types::combiner::MetricNode;
use measure_types::{MeasurementError, Result};

/// Combines `shards` into one tree via sequential-pairwise reduction with strides `1, 2, 4, …`,
/// placing the final sum at index `0` (§4.G: "the underlying lazy MPC scheduler parallelizes
/// independent ops automatically, so the tree shape exposes maximum parallelism without spawning
/// explicit threads").
pub fn combine_shards(mut shards: Vec<MetricNode>) -> Result<MetricNode> {
    if shards.is_empty() {
        return Err(MeasurementError::ProtocolState(
            "shard combiner requires at least one shard".to_string(),
        ));
    }
    tracing::debug!(shard_count = shards.len(), "combining shards");
    let mut stride = 1;
    while stride < shards.len() {
        let mut i = 0;
        while i + stride < shards.len() {
            shards[i] = shards[i].combine(&shards[i + stride])?;
            i += stride * 2;
        }
        stride *= 2;
    }
    Ok(shards.into_iter().next().expect("checked non-empty above"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_four_shards_by_strided_pairwise_sum() {
        let shards = vec![
            MetricNode::Value(1),
            MetricNode::Value(2),
            MetricNode::Value(4),
            MetricNode::Value(8),
        ];
        let combined = combine_shards(shards).unwrap();
        assert_eq!(combined.as_value().unwrap(), 15);
    }

    #[test]
    fn combines_an_odd_shard_count() {
        let shards = vec![MetricNode::Value(1), MetricNode::Value(2), MetricNode::Value(3)];
        let combined = combine_shards(shards).unwrap();
        assert_eq!(combined.as_value().unwrap(), 6);
    }

    #[test]
    fn combines_nested_dicts_unioning_ad_ids() {
        let shard_a = MetricNode::Dict(
            [("1".to_string(), MetricNode::Value(10))]
                .into_iter()
                .collect(),
        );
        let shard_b = MetricNode::Dict(
            [("2".to_string(), MetricNode::Value(20))]
                .into_iter()
                .collect(),
        );
        let combined = combine_shards(vec![shard_a, shard_b]).unwrap();
        let dict = combined.as_dict().unwrap();
        assert_eq!(dict["1"].as_value().unwrap(), 10);
        assert_eq!(dict["2"].as_value().unwrap(), 20);
    }

    #[test]
    fn rejects_an_empty_shard_list() {
        assert!(combine_shards(vec![]).is_err());
    }
}
