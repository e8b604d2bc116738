//! The seven named attribution rules (§4.C).
//!
//! Every rule reduces to: one or more secret upper/lower timestamp bounds derived from a
//! touchpoint ([`AttributionRule::compute_thresholds`]), and a pure boolean circuit deciding
//! whether a given conversion falls inside those bounds
//! ([`AttributionRule::is_attributable`]). A touchpoint's own `ts` doubles as the (unzeroed) lower
//! bound for single-window rules; only bounds the rule must *add* to `ts` need explicit zeroing
//! for padding, which [`window_upper`] and [`window_bounds`] do uniformly.

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::{MeasurementError, Result, RuleId, ONE_DAY_SECS};

use crate::secret::{SecConversion, SecTouchpoint};

const SEVEN_DAYS_SECS: u32 = 7 * ONE_DAY_SECS;
const TWENTY_EIGHT_DAYS_SECS: u32 = 28 * ONE_DAY_SECS;

/// One named attribution rule, expressed as a circuit over [`SecTouchpoint`]/[`SecConversion`].
pub trait AttributionRule<B: SecureBackend> {
    /// This rule's stable id.
    fn id(&self) -> RuleId;

    /// Computes the secret timestamp bound(s) this rule needs from `tp` alone, zeroed when `tp`
    /// is a padding entry so it can never attribute (§3).
    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>>;

    /// Decides whether `conv` falls inside `tp`'s attribution window, given the thresholds
    /// [`AttributionRule::compute_thresholds`] returned for `tp`. Returns a [`Width::Bit`] value.
    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>>;
}

/// `tp.ts + window`, or `0` if `tp` is padding (`ts == 0`).
fn window_upper<B: SecureBackend>(
    tp_ts: &SecValue<B>,
    window_secs: u32,
    backend: &mut B,
) -> Result<SecValue<B>> {
    let window = SecValue::constant(backend, Width::U32, window_secs as u64);
    let raw = tp_ts.add(&window, backend)?;
    let zero = SecValue::constant(backend, Width::U32, 0);
    let is_padding = tp_ts.eq(&zero, backend)?;
    is_padding.mux(&raw, &zero, backend)
}

/// `(tp.ts + lower, tp.ts + upper)`, or `(0, 0)` if `tp` is padding.
fn window_bounds<B: SecureBackend>(
    tp_ts: &SecValue<B>,
    lower_secs: u32,
    upper_secs: u32,
    backend: &mut B,
) -> Result<(SecValue<B>, SecValue<B>)> {
    let lower_offset = SecValue::constant(backend, Width::U32, lower_secs as u64);
    let upper_offset = SecValue::constant(backend, Width::U32, upper_secs as u64);
    let raw_lower = tp_ts.add(&lower_offset, backend)?;
    let raw_upper = tp_ts.add(&upper_offset, backend)?;
    let zero = SecValue::constant(backend, Width::U32, 0);
    let is_padding = tp_ts.eq(&zero, backend)?;
    let lower = is_padding.mux(&raw_lower, &zero, backend)?;
    let upper = is_padding.mux(&raw_upper, &zero, backend)?;
    Ok((lower, upper))
}

/// `conv.ts > tp.ts && conv.ts <= upper`.
fn in_single_window<B: SecureBackend>(
    tp_ts: &SecValue<B>,
    conv_ts: &SecValue<B>,
    upper: &SecValue<B>,
    backend: &mut B,
) -> Result<SecValue<B>> {
    let after_tp = tp_ts.lt(conv_ts, backend)?;
    let within_window = conv_ts.le(upper, backend)?;
    after_tp.and(&within_window, backend)
}

/// `conv.ts > lower && conv.ts <= upper`.
fn in_ranged_window<B: SecureBackend>(
    conv_ts: &SecValue<B>,
    lower: &SecValue<B>,
    upper: &SecValue<B>,
    backend: &mut B,
) -> Result<SecValue<B>> {
    let after_lower = lower.lt(conv_ts, backend)?;
    let within_window = conv_ts.le(upper, backend)?;
    after_lower.and(&within_window, backend)
}

/// `last_click_1d` (id 1): last click, conversion within 1 day after the click.
pub struct LastClick1d;

impl<B: SecureBackend> AttributionRule<B> for LastClick1d {
    fn id(&self) -> RuleId {
        RuleId::LAST_CLICK_1D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        Ok(vec![window_upper(&tp.ts, ONE_DAY_SECS, backend)?])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let in_window = in_single_window(&tp.ts, &conv.ts, &thresholds[0], backend)?;
        tp.is_click.and(&in_window, backend)
    }
}

/// `last_click_28d` (id 2): last click, conversion within 28 days after the click.
pub struct LastClick28d;

impl<B: SecureBackend> AttributionRule<B> for LastClick28d {
    fn id(&self) -> RuleId {
        RuleId::LAST_CLICK_28D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        Ok(vec![window_upper(&tp.ts, TWENTY_EIGHT_DAYS_SECS, backend)?])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let in_window = in_single_window(&tp.ts, &conv.ts, &thresholds[0], backend)?;
        tp.is_click.and(&in_window, backend)
    }
}

/// `last_touch_1d` (id 3): last touchpoint of any kind, conversion within 1 day after it.
pub struct LastTouch1d;

impl<B: SecureBackend> AttributionRule<B> for LastTouch1d {
    fn id(&self) -> RuleId {
        RuleId::LAST_TOUCH_1D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        Ok(vec![window_upper(&tp.ts, ONE_DAY_SECS, backend)?])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        in_single_window(&tp.ts, &conv.ts, &thresholds[0], backend)
    }
}

/// `last_touch_28d` (id 4): last click within 28 days, falling back to last touch of any kind
/// within 1 day.
pub struct LastTouch28d;

impl<B: SecureBackend> AttributionRule<B> for LastTouch28d {
    fn id(&self) -> RuleId {
        RuleId::LAST_TOUCH_28D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        let click_upper = window_upper(&tp.ts, TWENTY_EIGHT_DAYS_SECS, backend)?;
        let any_upper = window_upper(&tp.ts, ONE_DAY_SECS, backend)?;
        Ok(vec![click_upper, any_upper])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let click_window = in_single_window(&tp.ts, &conv.ts, &thresholds[0], backend)?;
        let via_click = tp.is_click.and(&click_window, backend)?;
        let any_window = in_single_window(&tp.ts, &conv.ts, &thresholds[1], backend)?;
        via_click.or(&any_window, backend)
    }
}

/// `last_click_2_7d` (id 5): last click, conversion strictly after 1 day but within 7 days of it.
pub struct LastClick27d;

impl<B: SecureBackend> AttributionRule<B> for LastClick27d {
    fn id(&self) -> RuleId {
        RuleId::LAST_CLICK_2_7D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        let (lower, upper) = window_bounds(&tp.ts, ONE_DAY_SECS, SEVEN_DAYS_SECS, backend)?;
        Ok(vec![lower, upper])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let in_window = in_ranged_window(&conv.ts, &thresholds[0], &thresholds[1], backend)?;
        tp.is_click.and(&in_window, backend)
    }
}

/// `last_touch_2_7d` (id 6): last click strictly between 1 and 7 days out, falling back to last
/// view within 1 day.
pub struct LastTouch27d;

impl<B: SecureBackend> AttributionRule<B> for LastTouch27d {
    fn id(&self) -> RuleId {
        RuleId::LAST_TOUCH_2_7D
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        let (click_lower, click_upper) = window_bounds(&tp.ts, ONE_DAY_SECS, SEVEN_DAYS_SECS, backend)?;
        let view_upper = window_upper(&tp.ts, ONE_DAY_SECS, backend)?;
        Ok(vec![click_lower, click_upper, view_upper])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let click_window = in_ranged_window(&conv.ts, &thresholds[0], &thresholds[1], backend)?;
        let via_click = tp.is_click.and(&click_window, backend)?;
        let view_window = in_single_window(&tp.ts, &conv.ts, &thresholds[2], backend)?;
        let is_view = tp.is_click.not(backend);
        let via_view = is_view.and(&view_window, backend)?;
        via_click.or(&via_view, backend)
    }
}

/// `last_click_1d_targetid` (id 7): [`LastClick1d`] additionally requiring the touchpoint and
/// conversion to share `target_id` and `action_type`.
pub struct LastClick1dTargetId;

impl<B: SecureBackend> AttributionRule<B> for LastClick1dTargetId {
    fn id(&self) -> RuleId {
        RuleId::LAST_CLICK_1D_TARGETID
    }

    fn compute_thresholds(&self, tp: &SecTouchpoint<B>, backend: &mut B) -> Result<Vec<SecValue<B>>> {
        Ok(vec![window_upper(&tp.ts, ONE_DAY_SECS, backend)?])
    }

    fn is_attributable(
        &self,
        tp: &SecTouchpoint<B>,
        conv: &SecConversion<B>,
        thresholds: &[SecValue<B>],
        backend: &mut B,
    ) -> Result<SecValue<B>> {
        let in_window = in_single_window(&tp.ts, &conv.ts, &thresholds[0], backend)?;
        let via_click = tp.is_click.and(&in_window, backend)?;
        let same_target = tp.target_id.eq(&conv.target_id, backend)?;
        let same_action = tp.action_type.eq(&conv.action_type, backend)?;
        via_click.and(&same_target, backend)?.and(&same_action, backend)
    }
}

/// Looks up the rule implementation for a [`RuleId`].
pub fn rule_by_id<B: SecureBackend>(id: RuleId) -> Result<Box<dyn AttributionRule<B>>> {
    match id {
        RuleId::LAST_CLICK_1D => Ok(Box::new(LastClick1d)),
        RuleId::LAST_CLICK_28D => Ok(Box::new(LastClick28d)),
        RuleId::LAST_TOUCH_1D => Ok(Box::new(LastTouch1d)),
        RuleId::LAST_TOUCH_28D => Ok(Box::new(LastTouch28d)),
        RuleId::LAST_CLICK_2_7D => Ok(Box::new(LastClick27d)),
        RuleId::LAST_TOUCH_2_7D => Ok(Box::new(LastTouch27d)),
        RuleId::LAST_CLICK_1D_TARGETID => Ok(Box::new(LastClick1dTargetId)),
        other => Err(MeasurementError::Policy(format!(
            "no rule implementation registered for rule id {}",
            other.id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_core::local::LocalBackend;
    use measure_types::{Conversion, Party, Touchpoint};

    use crate::secret::{SecConversion, SecTouchpoint};

    fn reveal(backend: &mut LocalBackend, v: &SecValue<LocalBackend>) -> u64 {
        v.open_to_party(Party::Publisher, backend).unwrap()
    }

    fn run_rule(
        rule: &dyn AttributionRule<LocalBackend>,
        tp: Touchpoint,
        conv: Conversion,
    ) -> bool {
        let mut backend = LocalBackend::new_publisher();
        let sec_tp = SecTouchpoint::from_plaintext(&mut backend, Party::Publisher, &tp);
        let sec_conv = SecConversion::from_plaintext(&mut backend, Party::Publisher, &conv);
        let thresholds = rule.compute_thresholds(&sec_tp, &mut backend).unwrap();
        let result = rule
            .is_attributable(&sec_tp, &sec_conv, &thresholds, &mut backend)
            .unwrap();
        reveal(&mut backend, &result) == 1
    }

    fn click(ts: u32) -> Touchpoint {
        Touchpoint {
            id: 0,
            is_click: true,
            ts,
            ad_id: 7,
            ad_id_compressed: 1,
            target_id: 9,
            action_type: 2,
            campaign_metadata: 0,
        }
    }

    fn view(ts: u32) -> Touchpoint {
        Touchpoint {
            is_click: false,
            ..click(ts)
        }
    }

    fn conv(ts: u32) -> Conversion {
        Conversion {
            ts,
            conv_value: 100,
            target_id: 9,
            action_type: 2,
            conv_metadata: 0,
        }
    }

    #[test]
    fn last_click_1d_attributes_inside_window_only() {
        assert!(run_rule(&LastClick1d, click(100), conv(100 + ONE_DAY_SECS)));
        assert!(!run_rule(&LastClick1d, click(100), conv(100 + ONE_DAY_SECS + 1)));
        assert!(!run_rule(&LastClick1d, click(100), conv(99)));
    }

    #[test]
    fn last_click_1d_ignores_views() {
        assert!(!run_rule(&LastClick1d, view(100), conv(150)));
    }

    #[test]
    fn padding_touchpoint_never_attributes() {
        assert!(!run_rule(&LastClick1d, Touchpoint::padding(0), conv(1)));
    }

    #[test]
    fn last_touch_1d_attributes_views_and_clicks() {
        assert!(run_rule(&LastTouch1d, view(100), conv(150)));
        assert!(run_rule(&LastTouch1d, click(100), conv(150)));
    }

    #[test]
    fn last_click_2_7d_requires_strictly_after_one_day() {
        assert!(!run_rule(&LastClick27d, click(0), conv(ONE_DAY_SECS)));
        assert!(run_rule(&LastClick27d, click(0), conv(ONE_DAY_SECS + 1)));
        assert!(run_rule(&LastClick27d, click(0), conv(SEVEN_DAYS_SECS)));
        assert!(!run_rule(&LastClick27d, click(0), conv(SEVEN_DAYS_SECS + 1)));
    }

    #[test]
    fn last_touch_28d_falls_back_to_one_day_view_window() {
        assert!(run_rule(&LastTouch28d, view(100), conv(100 + ONE_DAY_SECS)));
        assert!(!run_rule(&LastTouch28d, view(100), conv(100 + ONE_DAY_SECS + 1)));
        assert!(run_rule(
            &LastTouch28d,
            click(100),
            conv(100 + TWENTY_EIGHT_DAYS_SECS)
        ));
    }

    #[test]
    fn last_click_1d_targetid_requires_matching_target_and_action() {
        let mut mismatched_target = conv(100 + 10);
        mismatched_target.target_id = 999;
        assert!(!run_rule(&LastClick1dTargetId, click(100), mismatched_target));
        assert!(run_rule(&LastClick1dTargetId, click(100), conv(100 + 10)));
    }

    #[test]
    fn rule_by_id_resolves_all_seven() {
        for rule in RuleId::ALL {
            assert!(rule_by_id::<LocalBackend>(*rule).is_ok());
        }
    }
}
