//! Lift setup/config (§4.F "Setup via MPC exchange").
//!
//! `numPublisherBreakdowns`, `numPartnerCohorts`, and the accumulator width are treated here as
//! public configuration agreed by both parties out of band (the same status `max_num_touchpoints`
//! and `max_num_conversions` already have elsewhere in this system), rather than values actually
//! exchanged as secret shares and opened — see DESIGN.md. `should_skip_values` is likewise public
//! config rather than a secret bit: a real two-party run negotiates it to avoid leaking via output
//! shape, but the negotiated *value* is what both parties act on either way, so representing it as
//! plain config changes nothing observable here.

use measure_types::{MeasurementError, Result};

/// Negotiated lift-run configuration (§4.F steps 1-4).
#[derive(Debug, Clone, Copy)]
pub struct LiftConfig {
    /// Number of publisher breakdown groups (`0` disables breakdown fan-out).
    pub num_publisher_breakdowns: usize,
    /// Number of partner cohort groups (`0` disables cohort fan-out).
    pub num_partner_cohorts: usize,
    /// Whether the partner omitted the `values` column; when set, value/value² are not computed
    /// (they are reported as zero rather than attempted).
    pub should_skip_values: bool,
    /// Per-user purchase-row capacity (`K` in §4.F's event/converter algorithm).
    pub max_conv: usize,
}

impl LiftConfig {
    /// Asserts both parties agree on row counts before continuing (§4.F step 1: "fatal on
    /// mismatch").
    pub fn assert_equal_row_counts(publisher_rows: usize, partner_rows: usize) -> Result<()> {
        if publisher_rows != partner_rows {
            return Err(MeasurementError::Schema(format!(
                "row count mismatch between parties: publisher={publisher_rows} partner={partner_rows}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_row_counts_are_a_schema_error() {
        assert!(LiftConfig::assert_equal_row_counts(10, 9).is_err());
        assert!(LiftConfig::assert_equal_row_counts(10, 10).is_ok());
    }
}
