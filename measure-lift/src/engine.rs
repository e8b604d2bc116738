//! Lift engine orchestration: folds every user's row into test/control totals
//! ([`compute_metrics`]), then fans that out across publisher breakdowns and partner cohorts
//! ([`compute_grouped_metrics`]) (§4.F "Cohorts and breakdowns").

use measure_core::{SecValue, SecureBackend, Width};
use measure_types::lift::{GroupedLiftMetrics, LiftMetrics};
use measure_types::{Party, Result};

use crate::config::LiftConfig;
use crate::events::compute_user_events;
use crate::population::derive_population;
use crate::secret::SecUserRow;
use crate::valid::is_valid_purchase;

/// [`LiftMetrics`], held as secret-shared running totals while the computation is in progress.
pub struct SecLiftMetrics<B: SecureBackend> {
    test_population: SecValue<B>,
    control_population: SecValue<B>,
    test_conversions: SecValue<B>,
    control_conversions: SecValue<B>,
    test_converters: SecValue<B>,
    control_converters: SecValue<B>,
    test_value: SecValue<B>,
    control_value: SecValue<B>,
    test_value_squared: SecValue<B>,
    control_value_squared: SecValue<B>,
    test_num_conv_squared: SecValue<B>,
    control_num_conv_squared: SecValue<B>,
    test_match_count: SecValue<B>,
    control_match_count: SecValue<B>,
    test_impressions: SecValue<B>,
    control_impressions: SecValue<B>,
    test_clicks: SecValue<B>,
    control_clicks: SecValue<B>,
    test_spend: SecValue<B>,
    control_spend: SecValue<B>,
    test_reach: SecValue<B>,
    control_reach: SecValue<B>,
    test_clickers: SecValue<B>,
    control_clickers: SecValue<B>,
    reached_conversions: SecValue<B>,
    reached_value: SecValue<B>,
    test_conv_histogram: Vec<SecValue<B>>,
    control_conv_histogram: Vec<SecValue<B>>,
}

impl<B: SecureBackend> SecLiftMetrics<B> {
    fn zeroed(backend: &mut B, max_conv: usize) -> Self {
        let z32 = || SecValue::constant(backend, Width::U32, 0);
        Self {
            test_population: z32(),
            control_population: z32(),
            test_conversions: z32(),
            control_conversions: z32(),
            test_converters: z32(),
            control_converters: z32(),
            test_value: z32(),
            control_value: z32(),
            test_value_squared: z32(),
            control_value_squared: z32(),
            test_num_conv_squared: z32(),
            control_num_conv_squared: z32(),
            test_match_count: z32(),
            control_match_count: z32(),
            test_impressions: z32(),
            control_impressions: z32(),
            test_clicks: z32(),
            control_clicks: z32(),
            test_spend: z32(),
            control_spend: z32(),
            test_reach: z32(),
            control_reach: z32(),
            test_clickers: z32(),
            control_clickers: z32(),
            reached_conversions: z32(),
            reached_value: z32(),
            test_conv_histogram: (0..=max_conv).map(|_| z32()).collect(),
            control_conv_histogram: (0..=max_conv).map(|_| z32()).collect(),
        }
    }

    /// Reveals every field to `party`, assembling a plaintext [`LiftMetrics`] (§4.F "Reveal":
    /// default visibility is public; the XOR-share continuation path opens to both parties via
    /// two calls, one per party).
    pub fn reveal(&self, party: Party, backend: &mut B) -> Result<LiftMetrics> {
        let open = |v: &SecValue<B>, backend: &mut B| -> Result<i64> {
            Ok(v.open_to_party(party, backend)? as i64)
        };
        let open_hist = |hist: &[SecValue<B>], backend: &mut B| -> Result<Vec<i64>> {
            hist.iter().map(|h| open(h, backend)).collect()
        };
        Ok(LiftMetrics {
            test_population: open(&self.test_population, backend)?,
            control_population: open(&self.control_population, backend)?,
            test_conversions: open(&self.test_conversions, backend)?,
            control_conversions: open(&self.control_conversions, backend)?,
            test_converters: open(&self.test_converters, backend)?,
            control_converters: open(&self.control_converters, backend)?,
            test_value: open(&self.test_value, backend)?,
            control_value: open(&self.control_value, backend)?,
            test_value_squared: open(&self.test_value_squared, backend)?,
            control_value_squared: open(&self.control_value_squared, backend)?,
            test_num_conv_squared: open(&self.test_num_conv_squared, backend)?,
            control_num_conv_squared: open(&self.control_num_conv_squared, backend)?,
            test_match_count: open(&self.test_match_count, backend)?,
            control_match_count: open(&self.control_match_count, backend)?,
            test_impressions: open(&self.test_impressions, backend)?,
            control_impressions: open(&self.control_impressions, backend)?,
            test_clicks: open(&self.test_clicks, backend)?,
            control_clicks: open(&self.control_clicks, backend)?,
            test_spend: open(&self.test_spend, backend)?,
            control_spend: open(&self.control_spend, backend)?,
            test_reach: open(&self.test_reach, backend)?,
            control_reach: open(&self.control_reach, backend)?,
            test_clickers: open(&self.test_clickers, backend)?,
            control_clickers: open(&self.control_clickers, backend)?,
            reached_conversions: open(&self.reached_conversions, backend)?,
            reached_value: open(&self.reached_value, backend)?,
            test_conv_histogram: open_hist(&self.test_conv_histogram, backend)?,
            control_conv_histogram: open_hist(&self.control_conv_histogram, backend)?,
        })
    }
}

/// A [`GroupedLiftMetrics`], held secret-shared (§4.F "Cohorts and breakdowns").
pub struct GroupedSecLiftMetrics<B: SecureBackend> {
    /// Overall population metrics.
    pub metrics: SecLiftMetrics<B>,
    /// Per-partner-cohort metrics.
    pub cohort_metrics: Vec<SecLiftMetrics<B>>,
    /// Per-publisher-breakdown metrics.
    pub publisher_breakdowns: Vec<SecLiftMetrics<B>>,
}

impl<B: SecureBackend> GroupedSecLiftMetrics<B> {
    /// Reveals every group's metrics to `party` (§9: `publisherBreakdowns` is required, never
    /// omitted from the revealed shape).
    pub fn reveal(&self, party: Party, backend: &mut B) -> Result<GroupedLiftMetrics> {
        let cohort_metrics = self
            .cohort_metrics
            .iter()
            .map(|m| m.reveal(party, backend))
            .collect::<Result<Vec<_>>>()?;
        let publisher_breakdowns = self
            .publisher_breakdowns
            .iter()
            .map(|m| m.reveal(party, backend))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupedLiftMetrics {
            metrics: self.metrics.reveal(party, backend)?,
            cohort_metrics,
            publisher_breakdowns,
        })
    }
}

/// One user's masked contribution into a running [`SecLiftMetrics`].
fn fold_user<B: SecureBackend>(
    totals: &mut SecLiftMetrics<B>,
    row: &SecUserRow<B>,
    row_mask: &SecValue<B>,
    config: &LiftConfig,
    backend: &mut B,
) -> Result<()> {
    let (test_pop, control_pop) = derive_population(&row.opportunity, &row.test_flag, backend)?;
    let test_pop = test_pop.and(row_mask, backend)?;
    let control_pop = control_pop.and(row_mask, backend)?;

    let mut valid = Vec::with_capacity(row.purchase_ts.len());
    for ts in &row.purchase_ts {
        valid.push(is_valid_purchase(ts, &row.opportunity_ts, backend)?);
    }

    let test_events = compute_user_events(&test_pop, &valid, backend)?;
    let control_events = compute_user_events(&control_pop, &valid, backend)?;

    add_count(&mut totals.test_population, &test_pop, backend)?;
    add_count(&mut totals.control_population, &control_pop, backend)?;
    add_count(&mut totals.test_converters, &test_events.converter, backend)?;
    add_count(&mut totals.control_converters, &control_events.converter, backend)?;
    totals.test_num_conv_squared = totals.test_num_conv_squared.add(&test_events.num_conv_squared, backend)?;
    totals.control_num_conv_squared =
        totals.control_num_conv_squared.add(&control_events.num_conv_squared, backend)?;
    add_count(&mut totals.test_match_count, &test_pop, backend)?;
    add_count(&mut totals.control_match_count, &control_pop, backend)?;

    for (bucket_total, bucket_contribution) in
        totals.test_conv_histogram.iter_mut().zip(test_events.histogram.iter())
    {
        *bucket_total = bucket_total.add(bucket_contribution, backend)?;
    }
    for (bucket_total, bucket_contribution) in totals
        .control_conv_histogram
        .iter_mut()
        .zip(control_events.histogram.iter())
    {
        *bucket_total = bucket_total.add(bucket_contribution, backend)?;
    }

    let zero32 = SecValue::constant(backend, Width::U32, 0);
    let has_impressions = zero32.lt(&row.num_impressions, backend)?;
    let reached = has_impressions.and(row_mask, backend)?;

    let mut test_user_value = zero32.clone();
    let mut control_user_value = zero32.clone();

    for (event_bit, value) in test_events.events.iter().zip(row.purchase_value.iter()) {
        add_count(&mut totals.test_conversions, event_bit, backend)?;
        if !config.should_skip_values {
            let contribution = event_bit.mux(&zero32, value, backend)?;
            test_user_value = test_user_value.add(&contribution, backend)?;
            totals.test_value = totals.test_value.add(&contribution, backend)?;
        }
        let reached_event = event_bit.and(&reached, backend)?;
        add_count(&mut totals.reached_conversions, &reached_event, backend)?;
        if !config.should_skip_values {
            add_masked_value(&mut totals.reached_value, &reached_event, value, backend)?;
        }
    }
    for (event_bit, value) in control_events.events.iter().zip(row.purchase_value.iter()) {
        add_count(&mut totals.control_conversions, event_bit, backend)?;
        if !config.should_skip_values {
            let contribution = event_bit.mux(&zero32, value, backend)?;
            control_user_value = control_user_value.add(&contribution, backend)?;
            totals.control_value = totals.control_value.add(&contribution, backend)?;
        }
        let reached_event = event_bit.and(&reached, backend)?;
        add_count(&mut totals.reached_conversions, &reached_event, backend)?;
        if !config.should_skip_values {
            add_masked_value(&mut totals.reached_value, &reached_event, value, backend)?;
        }
    }

    if !config.should_skip_values {
        let test_value_squared = test_user_value.mul(&test_user_value, backend)?;
        let control_value_squared = control_user_value.mul(&control_user_value, backend)?;
        totals.test_value_squared = totals.test_value_squared.add(&test_value_squared, backend)?;
        totals.control_value_squared = totals.control_value_squared.add(&control_value_squared, backend)?;
    }

    add_masked_value(&mut totals.test_impressions, &test_pop, &row.num_impressions, backend)?;
    add_masked_value(&mut totals.control_impressions, &control_pop, &row.num_impressions, backend)?;
    add_masked_value(&mut totals.test_clicks, &test_pop, &row.num_clicks, backend)?;
    add_masked_value(&mut totals.control_clicks, &control_pop, &row.num_clicks, backend)?;
    add_masked_value(&mut totals.test_spend, &test_pop, &row.total_spend, backend)?;
    add_masked_value(&mut totals.control_spend, &control_pop, &row.total_spend, backend)?;
    add_count(&mut totals.test_reach, &has_impressions.and(&test_pop, backend)?, backend)?;
    add_count(&mut totals.control_reach, &has_impressions.and(&control_pop, backend)?, backend)?;

    let has_clicks = {
        let zero32 = SecValue::constant(backend, Width::U32, 0);
        zero32.lt(&row.num_clicks, backend)?
    };
    add_count(&mut totals.test_clickers, &has_clicks.and(&test_pop, backend)?, backend)?;
    add_count(&mut totals.control_clickers, &has_clicks.and(&control_pop, backend)?, backend)?;

    Ok(())
}

fn add_count<B: SecureBackend>(
    total: &mut SecValue<B>,
    bit: &SecValue<B>,
    backend: &mut B,
) -> Result<()> {
    let zero = SecValue::constant(backend, Width::U32, 0);
    let one = SecValue::constant(backend, Width::U32, 1);
    let contribution = bit.mux(&zero, &one, backend)?;
    *total = total.add(&contribution, backend)?;
    Ok(())
}

fn add_masked_value<B: SecureBackend>(
    total: &mut SecValue<B>,
    mask: &SecValue<B>,
    value: &SecValue<B>,
    backend: &mut B,
) -> Result<()> {
    let zero = SecValue::constant(backend, Width::U32, 0);
    let contribution = mask.mux(&zero, value, backend)?;
    *total = total.add(&contribution, backend)?;
    Ok(())
}

/// Computes overall metrics over `rows`, optionally further masked by `extra_mask` (a per-row
/// bit, e.g. group membership for a cohort/breakdown fan-out).
pub fn compute_metrics<B: SecureBackend>(
    rows: &[SecUserRow<B>],
    extra_mask: Option<&[SecValue<B>]>,
    config: &LiftConfig,
    backend: &mut B,
) -> Result<SecLiftMetrics<B>> {
    let mut totals = SecLiftMetrics::zeroed(backend, config.max_conv);
    let default_mask: Vec<SecValue<B>>;
    let masks: &[SecValue<B>] = match extra_mask {
        Some(m) => m,
        None => {
            default_mask = rows
                .iter()
                .map(|_| SecValue::constant(backend, Width::Bit, 1))
                .collect();
            &default_mask
        }
    };
    for (row, mask) in rows.iter().zip(masks.iter()) {
        fold_user(&mut totals, row, mask, config, backend)?;
    }
    Ok(totals)
}

/// Computes overall metrics plus the per-breakdown and per-cohort fan-outs (§4.F "Cohorts and
/// breakdowns"). `rows[i].breakdown_id`/`rows[i].cohort_id` select which group(s) row `i`
/// contributes to; rows missing an id never match any group.
pub fn compute_grouped_metrics<B: SecureBackend>(
    rows: &[SecUserRow<B>],
    config: &LiftConfig,
    backend: &mut B,
) -> Result<GroupedSecLiftMetrics<B>> {
    let metrics = compute_metrics(rows, None, config, backend)?;

    let mut publisher_breakdowns = Vec::with_capacity(config.num_publisher_breakdowns);
    for group in 0..config.num_publisher_breakdowns {
        let mask = group_mask(rows, group as u64, |r| r.breakdown_id.as_ref(), backend)?;
        publisher_breakdowns.push(compute_metrics(rows, Some(&mask), config, backend)?);
    }

    let mut cohort_metrics = Vec::with_capacity(config.num_partner_cohorts);
    for group in 0..config.num_partner_cohorts {
        let mask = group_mask(rows, group as u64, |r| r.cohort_id.as_ref(), backend)?;
        cohort_metrics.push(compute_metrics(rows, Some(&mask), config, backend)?);
    }

    Ok(GroupedSecLiftMetrics {
        metrics,
        cohort_metrics,
        publisher_breakdowns,
    })
}

fn group_mask<B: SecureBackend>(
    rows: &[SecUserRow<B>],
    group: u64,
    select: impl Fn(&SecUserRow<B>) -> Option<&SecValue<B>>,
    backend: &mut B,
) -> Result<Vec<SecValue<B>>> {
    let target = SecValue::constant(backend, Width::U16, group);
    let mut mask = Vec::with_capacity(rows.len());
    for row in rows {
        mask.push(match select(row) {
            Some(id) => id.eq(&target, backend)?,
            None => SecValue::constant(backend, Width::Bit, 0),
        });
    }
    Ok(mask)
}
