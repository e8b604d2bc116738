//! Secret-shared mirror of [`measure_types::lift::LiftUserRow`] (§4.F).

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::lift::LiftUserRow;
use measure_types::Party;

/// One user's joined opportunity/conversion row, secret-shared.
#[derive(Clone)]
pub struct SecUserRow<B: SecureBackend> {
    /// Whether this user had an opportunity to be exposed.
    pub opportunity: SecValue<B>,
    /// Test (`1`) vs. control (`0`).
    pub test_flag: SecValue<B>,
    /// Opportunity (exposure) timestamp.
    pub opportunity_ts: SecValue<B>,
    /// Number of impressions.
    pub num_impressions: SecValue<B>,
    /// Number of clicks.
    pub num_clicks: SecValue<B>,
    /// Total ad spend.
    pub total_spend: SecValue<B>,
    /// Purchase timestamps, padded to `max_conv`.
    pub purchase_ts: Vec<SecValue<B>>,
    /// Purchase values, padded to `max_conv`, aligned with `purchase_ts`.
    pub purchase_value: Vec<SecValue<B>>,
    /// Publisher-private breakdown group id, if configured.
    pub breakdown_id: Option<SecValue<B>>,
    /// Partner-private cohort group id, if configured.
    pub cohort_id: Option<SecValue<B>>,
}

impl<B: SecureBackend> SecUserRow<B> {
    /// Shares a plaintext row, already padded to `max_conv` purchases, owned by `owner`.
    pub fn from_plaintext(backend: &mut B, owner: Party, row: &LiftUserRow) -> Self {
        Self {
            opportunity: SecValue::from_plaintext(backend, owner, Width::Bit, row.opportunity as u64),
            test_flag: SecValue::from_plaintext(backend, owner, Width::Bit, row.test_flag as u64),
            opportunity_ts: SecValue::from_plaintext(
                backend,
                owner,
                Width::U32,
                row.opportunity_ts as u64,
            ),
            num_impressions: SecValue::from_plaintext(
                backend,
                owner,
                Width::U32,
                row.num_impressions as u64,
            ),
            num_clicks: SecValue::from_plaintext(backend, owner, Width::U32, row.num_clicks as u64),
            total_spend: SecValue::from_plaintext(backend, owner, Width::U32, row.total_spend as u64),
            purchase_ts: row
                .purchase_ts
                .iter()
                .map(|ts| SecValue::from_plaintext(backend, owner, Width::U32, *ts as u64))
                .collect(),
            purchase_value: row
                .purchase_value
                .iter()
                .map(|v| SecValue::from_plaintext(backend, owner, Width::U32, *v as u64))
                .collect(),
            breakdown_id: row
                .breakdown_id
                .map(|id| SecValue::from_plaintext(backend, owner, Width::U16, id as u64)),
            cohort_id: row
                .cohort_id
                .map(|id| SecValue::from_plaintext(backend, owner, Width::U16, id as u64)),
        }
    }
}
