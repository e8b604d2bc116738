//! Synthetic fixture generation for the attribution CSV format (§6) and the lift engine's row
//! model (§4.F), used by `measure-orchestrator`'s integration tests and demo invocations.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use measure_types::lift::LiftUserRow;

/// Renders one synthetic attribution-input CSV (§6) with `num_users` rows, each holding
/// `touchpoints_per_user` touchpoints and one conversion landing inside the last touchpoint's
/// 1-day window, so every row is attributable under `last_click_1d`.
pub fn synthetic_attribution_csv(rng: &mut ChaCha8Rng, num_users: usize, touchpoints_per_user: usize) -> String {
    let mut csv = String::from("timestamps,is_click,ad_ids,conversion_timestamps,conversion_values\n");
    for _ in 0..num_users {
        let mut ts = Vec::with_capacity(touchpoints_per_user);
        let mut ad_ids = Vec::with_capacity(touchpoints_per_user);
        let mut is_click = Vec::with_capacity(touchpoints_per_user);
        let mut cursor: u64 = 1;
        for _ in 0..touchpoints_per_user {
            cursor += rng.gen_range(1..1_000);
            ts.push(cursor);
            ad_ids.push(rng.gen_range(1..1_000));
            is_click.push(true);
        }
        let conv_ts = cursor + rng.gen_range(1..86_400);
        let conv_value = rng.gen_range(1..500);
        csv.push_str(&format!(
            "\"{}\",\"{}\",\"{}\",\"[{conv_ts}]\",\"[{conv_value}]\"\n",
            bracketed(&ts),
            bracketed_bools(&is_click),
            bracketed(&ad_ids),
        ));
    }
    csv
}

fn bracketed(values: &[u64]) -> String {
    format!(
        "[{}]",
        values.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
    )
}

fn bracketed_bools(values: &[bool]) -> String {
    format!(
        "[{}]",
        values
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Generates `num_users` synthetic [`LiftUserRow`]s: roughly half test, half control, with a
/// geometric-ish spread of purchase counts up to `max_conv`.
pub fn synthetic_lift_rows(rng: &mut ChaCha8Rng, num_users: usize, max_conv: usize) -> Vec<LiftUserRow> {
    (0..num_users)
        .map(|i| {
            let test_flag = i % 2 == 0;
            let num_purchases = rng.gen_range(0..=max_conv);
            let mut purchase_ts = Vec::with_capacity(num_purchases);
            let mut purchase_value = Vec::with_capacity(num_purchases);
            let mut cursor = 1_000u32;
            for _ in 0..num_purchases {
                cursor += rng.gen_range(1..10_000);
                purchase_ts.push(cursor);
                purchase_value.push(rng.gen_range(1..200));
            }
            LiftUserRow {
                opportunity: true,
                test_flag,
                opportunity_ts: 1,
                num_impressions: rng.gen_range(0..20),
                num_clicks: rng.gen_range(0..5),
                total_spend: rng.gen_range(0..1_000),
                purchase_ts,
                purchase_value,
                cohort_id: None,
                breakdown_id: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn synthetic_csv_has_one_header_and_num_users_data_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let csv = synthetic_attribution_csv(&mut rng, 5, 3);
        assert_eq!(csv.lines().count(), 6);
    }

    #[test]
    fn synthetic_lift_rows_alternate_test_and_control() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let rows = synthetic_lift_rows(&mut rng, 4, 4);
        assert_eq!(rows.len(), 4);
        assert!(rows[0].test_flag);
        assert!(!rows[1].test_flag);
    }

    #[test]
    fn synthetic_lift_rows_respect_max_conv() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rows = synthetic_lift_rows(&mut rng, 20, 4);
        assert!(rows.iter().all(|r| r.purchase_ts.len() <= 4));
    }
}
