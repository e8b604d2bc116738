//! Ad-id compression (§4.E steps 1-4): collect, assign sequential compressed ids, persist the
//! sidecar mapping, re-label touchpoints in place.

use measure_types::aggregation::{compress_ad_ids, CompressedAdIdMap};
use measure_types::{Result, Touchpoint};

/// The result of compressing ad ids across every user's touchpoint rows.
pub struct CompressionOutput {
    /// The compressed-id -> original-id sidecar, as persisted to the §6 JSON file.
    pub mapping: CompressedAdIdMap,
    /// The input rows with `ad_id_compressed` filled in (step 4: "re-labels touchpoints
    /// in-place").
    pub relabeled_users: Vec<Vec<Touchpoint>>,
}

/// Compresses the original ad ids appearing across every user's touchpoint row (step 1), assigns
/// sequential 1-based compressed ids (step 2), and re-labels every touchpoint with its compressed
/// id (step 4). Persisting the sidecar (step 3) is the caller's responsibility (a plain
/// `serde_json::to_writer` at the orchestrator layer), since this crate has no file-system
/// concerns.
pub fn compress_ad_ids_across_users(users: Vec<Vec<Touchpoint>>) -> Result<CompressionOutput> {
    let original_ids = users.iter().flatten().map(|tp| tp.ad_id);
    let compressed_to_original_ids = compress_ad_ids(original_ids)?;
    let original_to_compressed: std::collections::BTreeMap<u64, u16> = compressed_to_original_ids
        .iter()
        .map(|(&compressed, &original)| (original, compressed))
        .collect();

    let relabeled_users = users
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|mut tp| {
                    tp.ad_id_compressed = original_to_compressed.get(&tp.ad_id).copied().unwrap_or(0);
                    tp
                })
                .collect()
        })
        .collect();

    Ok(CompressionOutput {
        mapping: CompressedAdIdMap::from_compressed(&compressed_to_original_ids),
        relabeled_users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(ad_id: u64) -> Touchpoint {
        Touchpoint {
            id: 0,
            is_click: false,
            ts: 1,
            ad_id,
            ad_id_compressed: 0,
            target_id: 0,
            action_type: 0,
            campaign_metadata: 0,
        }
    }

    #[test]
    fn relabels_touchpoints_with_compressed_ids() {
        let users = vec![vec![tp(17), tp(42)], vec![tp(17)]];
        let out = compress_ad_ids_across_users(users).unwrap();
        assert_eq!(out.mapping.original_of(out.relabeled_users[0][0].ad_id_compressed), Some(17));
        assert_eq!(out.mapping.original_of(out.relabeled_users[0][1].ad_id_compressed), Some(42));
        assert_eq!(
            out.relabeled_users[0][0].ad_id_compressed,
            out.relabeled_users[1][0].ad_id_compressed
        );
    }

    #[test]
    fn no_ad_id_zero_stays_uncompressed() {
        let users = vec![vec![Touchpoint::padding(0)]];
        let out = compress_ad_ids_across_users(users).unwrap();
        assert_eq!(out.relabeled_users[0][0].ad_id_compressed, 0);
    }
}
