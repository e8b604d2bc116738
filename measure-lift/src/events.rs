//! Per-user event/converter/`numConvSquared`/histogram computation (§4.F).

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::Result;

/// One user's per-purchase-slot outputs from the §4.F event loop.
pub struct UserEvents<B: SecureBackend> {
    /// `event[i]`: whether slot `i` is a valid purchase by a counted user (`isUser ∧ V[i]`).
    pub events: Vec<SecValue<B>>,
    /// Whether this user converted at all (`seenValid` after the loop).
    pub converter: SecValue<B>,
    /// `numConvSquared`, fixed at the first valid purchase's `(K-i+1)²` (§4.F: "exploits ordered
    /// iteration so the squared-count accumulator becomes fixed once the first valid purchase is
    /// seen").
    pub num_conv_squared: SecValue<B>,
    /// `convHistogram[0..=K]` contribution from this single user (one bucket is `1`, the rest
    /// `0`, unless the user never converted, in which case bucket `0` is `1`).
    pub histogram: Vec<SecValue<B>>,
}

/// Runs the §4.F event loop for one user: `is_user` gates whether this row counts at all (e.g.
/// `testPop`/`controlPop`, optionally AND-masked further for a cohort/breakdown fan-out), and
/// `valid_purchases` is this user's `V[1..K]` (already length `K`, ascending time order).
pub fn compute_user_events<B: SecureBackend>(
    is_user: &SecValue<B>,
    valid_purchases: &[SecValue<B>],
    backend: &mut B,
) -> Result<UserEvents<B>> {
    let k = valid_purchases.len();
    let zero_bit = SecValue::constant(backend, Width::Bit, 0);
    let zero_u32 = SecValue::constant(backend, Width::U32, 0);
    let one_u32 = SecValue::constant(backend, Width::U32, 1);

    let mut seen_valid = zero_bit.clone();
    let mut num_conv_squared = zero_u32.clone();
    let mut histogram = vec![zero_u32.clone(); k + 1];
    let mut events = Vec::with_capacity(k);

    for (idx, v) in valid_purchases.iter().enumerate() {
        let cond = is_user.and(v, backend)?;
        let not_seen = seen_valid.not(backend);
        let new_purchase = cond.and(&not_seen, backend)?;

        let bucket = k - idx; // K - i + 1 with i = idx + 1
        let bucket_squared = SecValue::constant(backend, Width::U32, (bucket * bucket) as u64);
        num_conv_squared = new_purchase.mux(&num_conv_squared, &bucket_squared, backend)?;

        let new_purchase_count = new_purchase.mux(&zero_u32, &one_u32, backend)?;
        histogram[bucket] = histogram[bucket].add(&new_purchase_count, backend)?;

        seen_valid = seen_valid.or(&cond, backend)?;
        events.push(cond);
    }

    let never_converted = seen_valid.not(backend);
    let zero_bucket_hit = is_user.and(&never_converted, backend)?;
    let zero_bucket_count = zero_bucket_hit.mux(&zero_u32, &one_u32, backend)?;
    histogram[0] = histogram[0].add(&zero_bucket_count, backend)?;

    Ok(UserEvents {
        events,
        converter: seen_valid,
        num_conv_squared,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_core::local::LocalBackend;
    use measure_types::Party;

    fn bit(backend: &mut LocalBackend, v: u64) -> SecValue<LocalBackend> {
        SecValue::from_plaintext(backend, Party::Publisher, Width::Bit, v)
    }

    fn reveal(backend: &mut LocalBackend, v: &SecValue<LocalBackend>) -> u64 {
        v.open_to_party(Party::Publisher, backend).unwrap()
    }

    #[test]
    fn scenario_four_matches_spec_example() {
        // §8 scenario 4: validPurchases [1,1,0,1] => events [1,1,0,1], converter 1,
        // numConvSquared 16, histogram bump at bucket 4.
        let mut backend = LocalBackend::new_publisher();
        let is_user = bit(&mut backend, 1);
        let valid = vec![
            bit(&mut backend, 1),
            bit(&mut backend, 1),
            bit(&mut backend, 0),
            bit(&mut backend, 1),
        ];
        let result = compute_user_events(&is_user, &valid, &mut backend).unwrap();

        let events: Vec<u64> = result.events.iter().map(|e| reveal(&mut backend, e)).collect();
        assert_eq!(events, vec![1, 1, 0, 1]);
        assert_eq!(reveal(&mut backend, &result.converter), 1);
        assert_eq!(reveal(&mut backend, &result.num_conv_squared), 16);

        let histogram: Vec<u64> = result.histogram.iter().map(|h| reveal(&mut backend, h)).collect();
        assert_eq!(histogram, vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn never_converting_user_bumps_bucket_zero() {
        let mut backend = LocalBackend::new_publisher();
        let is_user = bit(&mut backend, 1);
        let valid = vec![bit(&mut backend, 0), bit(&mut backend, 0)];
        let result = compute_user_events(&is_user, &valid, &mut backend).unwrap();
        assert_eq!(reveal(&mut backend, &result.converter), 0);
        let histogram: Vec<u64> = result.histogram.iter().map(|h| reveal(&mut backend, h)).collect();
        assert_eq!(histogram, vec![1, 0, 0]);
    }

    #[test]
    fn excluded_user_contributes_nothing() {
        let mut backend = LocalBackend::new_publisher();
        let is_user = bit(&mut backend, 0);
        let valid = vec![bit(&mut backend, 1)];
        let result = compute_user_events(&is_user, &valid, &mut backend).unwrap();
        assert_eq!(reveal(&mut backend, &result.converter), 0);
        let histogram: Vec<u64> = result.histogram.iter().map(|h| reveal(&mut backend, h)).collect();
        assert_eq!(histogram, vec![0, 0]);
    }
}
