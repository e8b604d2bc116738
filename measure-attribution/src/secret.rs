//! Secret-shared mirrors of [`measure_types::touchpoint::Touchpoint`] and
//! [`measure_types::conversion::Conversion`] (§4.D).

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::{Conversion, Party, Touchpoint};

/// A touchpoint with every field a party may condition on held as a [`SecValue`].
///
/// `id` and `campaign_metadata` are deliberately absent: no rule reads either, and the reverse-scan
/// engine never needs a touchpoint's row-local handle inside the secure computation.
#[derive(Clone)]
pub struct SecTouchpoint<B: SecureBackend> {
    /// Whether this is a click.
    pub is_click: SecValue<B>,
    /// Touchpoint timestamp.
    pub ts: SecValue<B>,
    /// Compressed ad id (§4.E assigns this before attribution runs).
    pub ad_id_compressed: SecValue<B>,
    /// Opaque target id, used by rule 7.
    pub target_id: SecValue<B>,
    /// Opaque action type, used by rule 7.
    pub action_type: SecValue<B>,
}

impl<B: SecureBackend> SecTouchpoint<B> {
    /// Shares a touchpoint owned in the clear by `owner` (the publisher, in every real run).
    pub fn from_plaintext(backend: &mut B, owner: Party, tp: &Touchpoint) -> Self {
        Self {
            is_click: SecValue::from_plaintext(backend, owner, Width::Bit, tp.is_click as u64),
            ts: SecValue::from_plaintext(backend, owner, Width::U32, tp.ts as u64),
            ad_id_compressed: SecValue::from_plaintext(
                backend,
                owner,
                Width::U16,
                tp.ad_id_compressed as u64,
            ),
            target_id: SecValue::from_plaintext(backend, owner, Width::U64, tp.target_id),
            action_type: SecValue::from_plaintext(
                backend,
                owner,
                Width::U16,
                tp.action_type as u64,
            ),
        }
    }
}

/// A conversion with every field a rule may condition on held as a [`SecValue`].
#[derive(Clone)]
pub struct SecConversion<B: SecureBackend> {
    /// Conversion timestamp.
    pub ts: SecValue<B>,
    /// Conversion value.
    pub conv_value: SecValue<B>,
    /// Opaque target id, used by rule 7.
    pub target_id: SecValue<B>,
    /// Opaque action type, used by rule 7.
    pub action_type: SecValue<B>,
}

impl<B: SecureBackend> SecConversion<B> {
    /// Shares a conversion owned in the clear by `owner` (the partner, in every real run).
    pub fn from_plaintext(backend: &mut B, owner: Party, conv: &Conversion) -> Self {
        Self {
            ts: SecValue::from_plaintext(backend, owner, Width::U32, conv.ts as u64),
            conv_value: SecValue::from_plaintext(backend, owner, Width::U32, conv.conv_value as u64),
            target_id: SecValue::from_plaintext(backend, owner, Width::U64, conv.target_id),
            action_type: SecValue::from_plaintext(
                backend,
                owner,
                Width::U16,
                conv.action_type as u64,
            ),
        }
    }
}
