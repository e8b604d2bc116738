//! Rule-id publication (§4.C: "the publisher names the desired rules, the partner learns them via
//! a shared 3-bit id vector"), modeled as a Secure Value Layer exchange rather than assumed
//! out-of-band, since `attribution_rules` is a publisher-only CLI flag (§6) the partner process
//! never sees directly.

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::{Party, Result, RuleId};

/// A rule id the publisher has committed to a share of, pending reveal to the partner.
pub struct RuleSelection<B: SecureBackend> {
    share: SecValue<B>,
}

impl<B: SecureBackend> RuleSelection<B> {
    /// The publisher embeds its chosen rule id as a value it owns. Called once per entry in the
    /// publisher's `attribution_rules` CLI list.
    pub fn share_with_partner(backend: &mut B, rule_id: RuleId) -> Self {
        let share = SecValue::from_plaintext(backend, Party::Publisher, Width::U16, rule_id.id() as u64);
        Self { share }
    }

    /// Reveals the rule id to the partner. On the publisher's own instance this returns zero
    /// (§4.A: "receives zero on the non-`P` side") and is not a meaningful call; the publisher
    /// already knows its own selection.
    pub fn resolve_for_partner(&self, backend: &mut B) -> Result<RuleId> {
        let id = self.share.open_to_party(Party::Partner, backend)?;
        RuleId::from_id(id as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_core::local::LocalBackend;

    #[test]
    fn partner_resolves_the_publisher_chosen_rule() {
        let mut backend = LocalBackend::new_partner();
        let selection = RuleSelection::share_with_partner(&mut backend, RuleId::LAST_CLICK_1D);
        assert_eq!(selection.resolve_for_partner(&mut backend).unwrap(), RuleId::LAST_CLICK_1D);
    }

    #[test]
    fn publisher_instance_sees_no_plaintext_through_resolve() {
        let mut backend = LocalBackend::new_publisher();
        let selection = RuleSelection::share_with_partner(&mut backend, RuleId::LAST_TOUCH_28D);
        assert!(selection.resolve_for_partner(&mut backend).is_err());
    }
}
