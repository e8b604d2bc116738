//! Attribution rule catalogue and attribution result formats (§4.C, §3, §6).

use serde::{Deserialize, Serialize};

use crate::{MeasurementError, Result};

/// A named, time-window attribution rule (§4.C).
///
/// Each rule has a stable small integer id and a stable string name; both are part of the wire
/// protocol (the publisher names the desired rules, the partner learns them via a shared 3-bit
/// id vector), so neither may be renumbered or renamed without a protocol break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(u8);

/// One second, in the `u32` units `Touchpoint`/`Conversion` timestamps use.
pub const ONE_DAY_SECS: u32 = 86_400;

macro_rules! rules {
    ($($id:literal => $variant:ident, $name:literal;)+) => {
        impl RuleId {
            $(
                #[doc = concat!("The `", $name, "` rule (id ", $id, ").")]
                pub const $variant: RuleId = RuleId($id);
            )+

            /// All known rules, in ascending id order.
            pub const ALL: &'static [RuleId] = &[$(RuleId::$variant),+];

            /// Looks up a rule by its wire name.
            pub fn from_name(name: &str) -> Result<Self> {
                match name {
                    $($name => Ok(RuleId::$variant),)+
                    other => Err(MeasurementError::Policy(format!(
                        "unknown attribution rule name: {other}"
                    ))),
                }
            }

            /// Looks up a rule by its wire id.
            pub fn from_id(id: u8) -> Result<Self> {
                match id {
                    $($id => Ok(RuleId::$variant),)+
                    other => Err(MeasurementError::Policy(format!(
                        "unknown attribution rule id: {other}"
                    ))),
                }
            }

            /// The rule's stable wire name.
            pub fn name(self) -> &'static str {
                match self.0 {
                    $($id => $name,)+
                    _ => unreachable!("RuleId can only be constructed via from_id/from_name/ALL"),
                }
            }
        }
    };
}

rules! {
    1 => LAST_CLICK_1D, "last_click_1d";
    2 => LAST_CLICK_28D, "last_click_28d";
    3 => LAST_TOUCH_1D, "last_touch_1d";
    4 => LAST_TOUCH_28D, "last_touch_28d";
    5 => LAST_CLICK_2_7D, "last_click_2_7d";
    6 => LAST_TOUCH_2_7D, "last_touch_2_7d";
    7 => LAST_CLICK_1D_TARGETID, "last_click_1d_targetid";
}

impl RuleId {
    /// The rule's wire id. Fits in 3 bits per §4.C ("partner learns them via a publisher-shared
    /// 3-bit id vector").
    pub fn id(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which attribution output format is in use (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AttributionOutputFormat {
    /// Per conversion, a single `is_attributed` bit.
    #[default]
    Default,
    /// Per conversion, `{adId, convValue, isAttributed}`; `use_new_output_format` policy.
    Reformatted,
}

/// Default-format attribution result: one bit per conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionBit {
    /// Whether this conversion was attributed to any touchpoint.
    pub is_attributed: bool,
}

/// Reformatted attribution result: one record per conversion, including the winning ad.
///
/// §3 invariant: `ad_id != 0` iff `is_attributed == true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionReformatted {
    /// The compressed ad id of the winning touchpoint, or `0` if none.
    pub ad_id: u16,
    /// The conversion's value, carried through unconditionally (consumed by aggregation even
    /// when unattributed, to support the "seen but unattributed" invariant of §3 scenario 3).
    pub conv_value: u32,
    /// Whether this conversion was attributed.
    pub is_attributed: bool,
}

impl AttributionReformatted {
    /// Checks the §3 invariant `ad_id != 0 <=> is_attributed`.
    pub fn is_consistent(&self) -> bool {
        (self.ad_id != 0) == self.is_attributed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_round_trip_by_name_and_id() {
        for rule in RuleId::ALL {
            assert_eq!(RuleId::from_name(rule.name()).unwrap(), *rule);
            assert_eq!(RuleId::from_id(rule.id()).unwrap(), *rule);
        }
    }

    #[test]
    fn unknown_rule_name_or_id_is_policy_error() {
        assert!(matches!(
            RuleId::from_name("not_a_rule"),
            Err(MeasurementError::Policy(_))
        ));
        assert!(matches!(
            RuleId::from_id(99),
            Err(MeasurementError::Policy(_))
        ));
    }

    #[test]
    fn reformatted_invariant_holds_for_attributed_and_not() {
        let attributed = AttributionReformatted {
            ad_id: 7,
            conv_value: 100,
            is_attributed: true,
        };
        let not_attributed = AttributionReformatted {
            ad_id: 0,
            conv_value: 100,
            is_attributed: false,
        };
        assert!(attributed.is_consistent());
        assert!(not_attributed.is_consistent());
        let broken = AttributionReformatted {
            ad_id: 0,
            conv_value: 1,
            is_attributed: true,
        };
        assert!(!broken.is_consistent());
    }
}
