//! Lift metrics and grouped lift metrics (§3, §4.F, §6).
//!
//! Field shape mirrors `OutputMetricsData` exactly: twelve test/control paired counters (24
//! scalars) plus two population-wide, unpaired counters (`reachedConversions`, `reachedValue`)
//! plus the two histograms. §9's Open Question about the legacy vs. reverse-scan
//! `numConvSquared` semantics is resolved in favor of the reverse-scan formulation of §4.F; see
//! DESIGN.md.

use serde::{Deserialize, Serialize};

use crate::{MeasurementError, Result};

/// A single lift metrics record: test vs. control counters plus conversion histograms.
///
/// All scalar counters are signed 64-bit so that [`crate::combiner`]'s threshold-gate sentinel
/// (`-1`) can be stored in the same field after the shard combiner's gate runs (§4.G).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiftMetrics {
    /// Size of the test population (`opp ∧ testFlag`).
    pub test_population: i64,
    /// Size of the control population (`opp ∧ ¬testFlag`).
    pub control_population: i64,
    /// Count of valid test conversions.
    pub test_conversions: i64,
    /// Count of valid control conversions.
    pub control_conversions: i64,
    /// Count of distinct test converters.
    pub test_converters: i64,
    /// Count of distinct control converters.
    pub control_converters: i64,
    /// Sum of test conversion value.
    pub test_value: i64,
    /// Sum of control conversion value.
    pub control_value: i64,
    /// Sum of squared per-user test conversion value.
    pub test_value_squared: i64,
    /// Sum of squared per-user control conversion value.
    pub control_value_squared: i64,
    /// Sum of squared per-user test conversion counts.
    pub test_num_conv_squared: i64,
    /// Sum of squared per-user control conversion counts.
    pub control_num_conv_squared: i64,
    /// Count of matched test rows (joined opportunity/conversion rows).
    pub test_match_count: i64,
    /// Count of matched control rows.
    pub control_match_count: i64,
    /// Sum of test impressions.
    pub test_impressions: i64,
    /// Sum of control impressions.
    pub control_impressions: i64,
    /// Sum of test clicks.
    pub test_clicks: i64,
    /// Sum of control clicks.
    pub control_clicks: i64,
    /// Sum of test spend.
    pub test_spend: i64,
    /// Sum of control spend.
    pub control_spend: i64,
    /// Count of reached (`numImpressions>0`) test users.
    pub test_reach: i64,
    /// Count of reached control users.
    pub control_reach: i64,
    /// Count of test users with at least one click.
    pub test_clickers: i64,
    /// Count of control users with at least one click.
    pub control_clickers: i64,
    /// Conversions among reached users (population-wide, not test/control paired).
    pub reached_conversions: i64,
    /// Value among reached users (population-wide, not test/control paired).
    pub reached_value: i64,
    /// `testConvHistogram[k]`: number of test users with exactly `k` valid conversions.
    pub test_conv_histogram: Vec<i64>,
    /// `controlConvHistogram[k]`: number of control users with exactly `k` valid conversions.
    pub control_conv_histogram: Vec<i64>,
}

impl LiftMetrics {
    /// Builds a zeroed metrics record with histograms of length `max_conv + 1` (§3 invariant).
    pub fn zeroed(max_conv: usize) -> Self {
        Self {
            test_conv_histogram: vec![0; max_conv + 1],
            control_conv_histogram: vec![0; max_conv + 1],
            ..Default::default()
        }
    }

    /// Adds another metrics record into this one, field-by-field, matching the original's
    /// `operator+`. Histograms must have equal length.
    pub fn add_assign(&mut self, other: &LiftMetrics) -> Result<()> {
        if self.test_conv_histogram.len() != other.test_conv_histogram.len()
            || self.control_conv_histogram.len() != other.control_conv_histogram.len()
        {
            return Err(MeasurementError::Schema(
                "lift histogram length mismatch during combine".to_string(),
            ));
        }
        self.test_population += other.test_population;
        self.control_population += other.control_population;
        self.test_conversions += other.test_conversions;
        self.control_conversions += other.control_conversions;
        self.test_converters += other.test_converters;
        self.control_converters += other.control_converters;
        self.test_value += other.test_value;
        self.control_value += other.control_value;
        self.test_value_squared += other.test_value_squared;
        self.control_value_squared += other.control_value_squared;
        self.test_num_conv_squared += other.test_num_conv_squared;
        self.control_num_conv_squared += other.control_num_conv_squared;
        self.test_match_count += other.test_match_count;
        self.control_match_count += other.control_match_count;
        self.test_impressions += other.test_impressions;
        self.control_impressions += other.control_impressions;
        self.test_clicks += other.test_clicks;
        self.control_clicks += other.control_clicks;
        self.test_spend += other.test_spend;
        self.control_spend += other.control_spend;
        self.test_reach += other.test_reach;
        self.control_reach += other.control_reach;
        self.test_clickers += other.test_clickers;
        self.control_clickers += other.control_clickers;
        self.reached_conversions += other.reached_conversions;
        self.reached_value += other.reached_value;
        for (a, b) in self
            .test_conv_histogram
            .iter_mut()
            .zip(other.test_conv_histogram.iter())
        {
            *a += b;
        }
        for (a, b) in self
            .control_conv_histogram
            .iter_mut()
            .zip(other.control_conv_histogram.iter())
        {
            *a += b;
        }
        Ok(())
    }
}

/// One user's joined opportunity/conversion row, as consumed by the lift engine (§4.F).
///
/// `opportunity` defaults to `true` when the input schema omits the column (§4.F: "If
/// `opportunity` is absent from the input schema, treat it as all 1s").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftUserRow {
    /// Whether this user had an opportunity to be exposed (defaults to `true`).
    pub opportunity: bool,
    /// Whether this user is in the test (`true`) or control (`false`) population.
    pub test_flag: bool,
    /// The opportunity (exposure) timestamp.
    pub opportunity_ts: u32,
    /// Number of ad impressions this user received.
    pub num_impressions: u32,
    /// Number of ad clicks this user made.
    pub num_clicks: u32,
    /// Total ad spend attributed to this user.
    pub total_spend: u32,
    /// This user's purchase timestamps, ascending.
    pub purchase_ts: Vec<u32>,
    /// This user's purchase values, aligned by index with `purchase_ts`.
    pub purchase_value: Vec<u32>,
    /// Partner-private cohort id, if cohort breakdowns are configured.
    pub cohort_id: Option<u16>,
    /// Publisher-private breakdown id, if publisher breakdowns are configured.
    pub breakdown_id: Option<u16>,
}

impl LiftUserRow {
    /// Pads (or rejects, if oversize) this row's purchase vectors to `max_conv` entries with
    /// inert `(ts=0, value=0)` pairs, matching the touchpoint/conversion padding convention.
    pub fn pad_purchases(mut self, max_conv: usize) -> Result<Self> {
        if self.purchase_ts.len() != self.purchase_value.len() {
            return Err(MeasurementError::Schema(
                "purchase_ts and purchase_value must have equal length".to_string(),
            ));
        }
        if self.purchase_ts.len() > max_conv {
            return Err(MeasurementError::Capacity(format!(
                "user has {} purchases, exceeds max_num_conversions={max_conv}",
                self.purchase_ts.len()
            )));
        }
        self.purchase_ts.resize(max_conv, 0);
        self.purchase_value.resize(max_conv, 0);
        Ok(self)
    }
}

/// A grouped lift-metrics record: the overall metrics plus per-cohort and per-publisher-breakdown
/// fan-outs (§3, §6).
///
/// `publisher_breakdowns` is required, not optional: §9 resolves the "older shards missing
/// `publisherBreakdowns`" Open Question by rejecting such shards rather than silently zeroing
/// them (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedLiftMetrics {
    /// Overall population metrics.
    pub metrics: LiftMetrics,
    /// Per-partner-cohort metrics, one entry per cohort id.
    pub cohort_metrics: Vec<LiftMetrics>,
    /// Per-publisher-breakdown metrics, one entry per breakdown id.
    pub publisher_breakdowns: Vec<LiftMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_histogram_length_matches_max_conv_plus_one() {
        let metrics = LiftMetrics::zeroed(4);
        assert_eq!(metrics.test_conv_histogram.len(), 5);
        assert_eq!(metrics.control_conv_histogram.len(), 5);
    }

    #[test]
    fn add_assign_sums_every_scalar_and_histogram_bucket() {
        let mut a = LiftMetrics::zeroed(1);
        a.test_value = 10;
        a.test_conv_histogram = vec![1, 2];
        let mut b = LiftMetrics::zeroed(1);
        b.test_value = 5;
        b.test_conv_histogram = vec![3, 4];
        a.add_assign(&b).unwrap();
        assert_eq!(a.test_value, 15);
        assert_eq!(a.test_conv_histogram, vec![4, 6]);
    }

    #[test]
    fn add_assign_rejects_mismatched_histogram_lengths() {
        let mut a = LiftMetrics::zeroed(1);
        let b = LiftMetrics::zeroed(2);
        assert!(a.add_assign(&b).is_err());
    }

    #[test]
    fn pad_purchases_extends_with_inert_pairs() {
        let row = LiftUserRow {
            opportunity: true,
            test_flag: true,
            opportunity_ts: 1,
            num_impressions: 1,
            num_clicks: 0,
            total_spend: 0,
            purchase_ts: vec![5],
            purchase_value: vec![10],
            cohort_id: None,
            breakdown_id: None,
        }
        .pad_purchases(3)
        .unwrap();
        assert_eq!(row.purchase_ts, vec![5, 0, 0]);
        assert_eq!(row.purchase_value, vec![10, 0, 0]);
    }

    #[test]
    fn pad_purchases_rejects_oversize_rows() {
        let row = LiftUserRow {
            opportunity: true,
            test_flag: true,
            opportunity_ts: 1,
            num_impressions: 0,
            num_clicks: 0,
            total_spend: 0,
            purchase_ts: vec![1, 2, 3],
            purchase_value: vec![1, 2, 3],
            cohort_id: None,
            breakdown_id: None,
        };
        assert!(row.pad_purchases(2).is_err());
    }

    #[test]
    fn grouped_metrics_round_trip_through_json() {
        let grouped = GroupedLiftMetrics {
            metrics: LiftMetrics::zeroed(2),
            cohort_metrics: vec![LiftMetrics::zeroed(2)],
            publisher_breakdowns: vec![LiftMetrics::zeroed(2), LiftMetrics::zeroed(2)],
        };
        let json = serde_json::to_string(&grouped).unwrap();
        let reloaded: GroupedLiftMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, grouped);
    }
}
