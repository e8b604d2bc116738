//! The valid-purchase predicate (§4.F "Valid-purchase predicate").

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::Result;

/// `purchaseTs + 10s > opportunityTs` (§4.F: "the 10s slack is a contract").
pub fn is_valid_purchase<B: SecureBackend>(
    purchase_ts: &SecValue<B>,
    opportunity_ts: &SecValue<B>,
    backend: &mut B,
) -> Result<SecValue<B>> {
    let slack = SecValue::constant(backend, Width::U32, 10);
    let shifted = purchase_ts.add(&slack, backend)?;
    opportunity_ts.lt(&shifted, backend)
}
