//! Per-user touchpoint records (§3).

use serde::{Deserialize, Serialize};

/// The sentinel original/compressed ad id meaning "no ad" (§3 invariants).
pub const NO_AD_ID: u64 = 0;

/// A single publisher-side ad event (impression or click) on a user.
///
/// `id` is a row-local unique integer used only to keep a stable handle on a touchpoint across
/// the pipeline (e.g. when re-labeling with a compressed ad id); it is never revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Touchpoint {
    /// Row-local unique identifier.
    pub id: u32,
    /// Whether this touchpoint is a click (`true`) or a view/impression (`false`).
    pub is_click: bool,
    /// Touchpoint timestamp, in seconds.
    pub ts: u32,
    /// The original, uncompressed 64-bit ad id.
    pub ad_id: u64,
    /// The compressed ad id assigned during aggregation's ad-id compression step; `0` until
    /// compression has run.
    pub ad_id_compressed: u16,
    /// Opaque target identifier, used by rule 7 (`last_click_1d_targetid`).
    pub target_id: u64,
    /// Opaque action-type code, used by rule 7.
    pub action_type: u16,
    /// Opaque campaign metadata, carried through but not interpreted by any rule.
    pub campaign_metadata: u64,
}

impl Touchpoint {
    /// A padded (fully inert) touchpoint: `ts=0, ad_id=0` per §3's padding invariant.
    ///
    /// A padded touchpoint can never be attributed: every rule's thresholds are derived from
    /// `ts`, and a threshold of `0` only ever satisfies `conv.ts < 0`, which is impossible for a
    /// `u32`.
    pub fn padding(id: u32) -> Self {
        Self {
            id,
            is_click: false,
            ts: 0,
            ad_id: NO_AD_ID,
            ad_id_compressed: 0,
            target_id: 0,
            action_type: 0,
            campaign_metadata: 0,
        }
    }

    /// Whether this entry is padding (§3: `ts=0, adId=0`).
    pub fn is_padding(&self) -> bool {
        self.ts == 0 && self.ad_id == NO_AD_ID
    }
}

/// Pads (or truncates-with-error, see [`pad_touchpoints`]) a user's touchpoint row to `max_tp`
/// entries, preserving the sort order of §3 ("views before clicks; within the same class,
/// ascending `ts`").
///
/// Returns the padded vector. Sorting is skipped when `resort_forbidden` is set, matching §4.D's
/// contract that XOR-shared input must not be re-sorted because ordering was already established
/// upstream.
pub fn pad_touchpoints(
    mut touchpoints: Vec<Touchpoint>,
    max_tp: usize,
    resort_forbidden: bool,
) -> crate::Result<Vec<Touchpoint>> {
    if touchpoints.len() > max_tp {
        return Err(crate::MeasurementError::Capacity(format!(
            "user has {} touchpoints, exceeds max_num_touchpoints={max_tp}",
            touchpoints.len()
        )));
    }
    if !resort_forbidden {
        touchpoints.sort_by_key(|tp| (tp.is_click, tp.ts));
    }
    let mut next_id = touchpoints.iter().map(|tp| tp.id).max().map_or(0, |m| m + 1);
    while touchpoints.len() < max_tp {
        touchpoints.push(Touchpoint::padding(next_id));
        next_id += 1;
    }
    Ok(touchpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(id: u32, is_click: bool, ts: u32, ad_id: u64) -> Touchpoint {
        Touchpoint {
            id,
            is_click,
            ts,
            ad_id,
            ad_id_compressed: 0,
            target_id: 0,
            action_type: 0,
            campaign_metadata: 0,
        }
    }

    #[test]
    fn pads_to_fixed_width_with_inert_entries() {
        let padded = pad_touchpoints(vec![tp(0, false, 100, 1)], 4, false).unwrap();
        assert_eq!(padded.len(), 4);
        assert!(padded[1..].iter().all(Touchpoint::is_padding));
    }

    #[test]
    fn sorts_views_before_clicks_then_ascending_ts() {
        let rows = vec![
            tp(0, true, 50, 1),
            tp(1, false, 200, 2),
            tp(2, false, 100, 3),
        ];
        let padded = pad_touchpoints(rows, 4, false).unwrap();
        assert_eq!(
            padded[0..3]
                .iter()
                .map(|t| (t.is_click, t.ts))
                .collect::<Vec<_>>(),
            vec![(false, 100), (false, 200), (true, 50)]
        );
    }

    #[test]
    fn does_not_resort_when_forbidden() {
        let rows = vec![tp(0, true, 50, 1), tp(1, false, 200, 2)];
        let padded = pad_touchpoints(rows.clone(), 2, true).unwrap();
        assert_eq!(padded[0].ts, rows[0].ts);
        assert_eq!(padded[1].ts, rows[1].ts);
    }

    #[test]
    fn rejects_rows_beyond_capacity() {
        let rows = vec![tp(0, false, 1, 1), tp(1, false, 2, 2), tp(2, false, 3, 3)];
        assert!(pad_touchpoints(rows, 2, false).is_err());
    }
}
