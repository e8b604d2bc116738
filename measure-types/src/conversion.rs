//! Per-user conversion records (§3).

use serde::{Deserialize, Serialize};

/// A single partner-side outcome event (e.g. a purchase) on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Conversion timestamp, in seconds.
    pub ts: u32,
    /// The conversion's value (e.g. purchase amount, in minor currency units).
    pub conv_value: u32,
    /// Opaque target identifier, used by rule 7.
    pub target_id: u64,
    /// Opaque action-type code, used by rule 7.
    pub action_type: u16,
    /// Opaque conversion metadata, carried through but not interpreted by any rule.
    pub conv_metadata: u64,
}

impl Conversion {
    /// A padded (fully inert) conversion: `ts=0, convValue=0` per §3.
    ///
    /// A padded conversion can never attribute: every comparison against a positive threshold
    /// fails, and against a zero threshold it fails strict-less-than on `tp.ts < conv.ts = 0`.
    pub fn padding() -> Self {
        Self {
            ts: 0,
            conv_value: 0,
            target_id: 0,
            action_type: 0,
            conv_metadata: 0,
        }
    }

    /// Whether this entry is padding.
    pub fn is_padding(&self) -> bool {
        self.ts == 0 && self.conv_value == 0
    }
}

/// Pads a user's conversion row to `max_conv` entries, sorted ascending by `ts` per §3.
pub fn pad_conversions(
    mut conversions: Vec<Conversion>,
    max_conv: usize,
    resort_forbidden: bool,
) -> crate::Result<Vec<Conversion>> {
    if conversions.len() > max_conv {
        return Err(crate::MeasurementError::Capacity(format!(
            "user has {} conversions, exceeds max_num_conversions={max_conv}",
            conversions.len()
        )));
    }
    if !resort_forbidden {
        conversions.sort_by_key(|c| c.ts);
    }
    while conversions.len() < max_conv {
        conversions.push(Conversion::padding());
    }
    Ok(conversions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(ts: u32, value: u32) -> Conversion {
        Conversion {
            ts,
            conv_value: value,
            target_id: 0,
            action_type: 0,
            conv_metadata: 0,
        }
    }

    #[test]
    fn empty_conversion_list_pads_entirely() {
        let padded = pad_conversions(vec![], 4, false).unwrap();
        assert_eq!(padded.len(), 4);
        assert!(padded.iter().all(Conversion::is_padding));
    }

    #[test]
    fn sorts_ascending_by_timestamp() {
        let padded = pad_conversions(vec![conv(300, 1), conv(100, 2)], 2, false).unwrap();
        assert_eq!(padded.iter().map(|c| c.ts).collect::<Vec<_>>(), vec![
            100, 300
        ]);
    }
}
