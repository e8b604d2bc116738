//! The reverse-scan attribution engine (§4.D).
//!
//! For each conversion, touchpoints are visited from most recent to oldest. A running
//! "already has a winner" bit gates every later (older) touchpoint from overwriting an
//! earlier (more recent) win — the secure equivalent of "take the first match and stop",
//! without ever branching on a secret. Touchpoints must already be sorted ascending by `ts`
//! within click-class (the row padding in `measure_types::touchpoint` guarantees this), so
//! "most recent first" is simply "highest index first".

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::Result;

use crate::rules::AttributionRule;
use crate::secret::{SecConversion, SecTouchpoint};

/// One conversion's attribution result: whether it was attributed at all, and the compressed ad
/// id of the winning touchpoint (`0` if none).
pub struct AttributionOutcome<B: SecureBackend> {
    /// Whether any touchpoint won this conversion.
    pub is_attributed: SecValue<B>,
    /// The compressed ad id of the winning touchpoint, or `0`.
    pub winner_ad_id: SecValue<B>,
}

/// Runs `rule` over every (touchpoint, conversion) pair for one user, reverse-scanning
/// touchpoints per conversion (§4.D).
///
/// Returns one [`AttributionOutcome`] per conversion, in the same order as `conversions`.
/// Per-touchpoint thresholds are computed once, up front, and reused across every conversion
/// (§4.D: "calling code submits gate ops that may be reordered and batched").
pub fn attribute_reverse_scan<B: SecureBackend>(
    rule: &dyn AttributionRule<B>,
    touchpoints: &[SecTouchpoint<B>],
    conversions: &[SecConversion<B>],
    backend: &mut B,
) -> Result<Vec<AttributionOutcome<B>>> {
    let mut thresholds: Vec<Vec<SecValue<B>>> = Vec::with_capacity(touchpoints.len());
    for tp in touchpoints {
        thresholds.push(rule.compute_thresholds(tp, backend)?);
    }

    let mut outcomes = Vec::with_capacity(conversions.len());
    for conv in conversions {
        let mut has_attr = SecValue::constant(backend, Width::Bit, 0);
        let mut winner_ad_id = SecValue::constant(backend, Width::U16, 0);

        for (tp, tp_thresholds) in touchpoints.iter().zip(thresholds.iter()).rev() {
            let attributable = rule.is_attributable(tp, conv, tp_thresholds, backend)?;
            let not_has_attr = has_attr.not(backend);
            let is_winner = attributable.and(&not_has_attr, backend)?;

            winner_ad_id = is_winner.mux(&winner_ad_id, &tp.ad_id_compressed, backend)?;
            has_attr = has_attr.or(&attributable, backend)?;
        }

        outcomes.push(AttributionOutcome {
            is_attributed: has_attr,
            winner_ad_id,
        });
    }

    Ok(outcomes)
}
