//! The aggregation game binary (§4.E, §6): compresses ad ids, attributes conversions with a
//! single rule, folds every conversion into the oblivious store, and reveals totals per original
//! ad id.
//!
//! Mirrors `measure-aggregation::engine`'s own end-to-end test: attribution and aggregation run
//! back-to-back inside one secure computation rather than round-tripping an intermediate
//! secret-shared result through disk between two separate processes.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use eyre::{Context, Result};

use measure_aggregation::{aggregate, compress_ad_ids_across_users, reveal, LocalObliviousStore};
use measure_attribution::{attribute_reverse_scan, rule_by_id, SecConversion, SecTouchpoint};
use measure_core::local::LocalBackend;
use measure_core::{SecValue, Width};
use measure_orchestrator::{CommonArgs, ShardStats};
use measure_types::aggregation::MeasurementAggregate;
use measure_types::csv_io::parse_attribution_csv;
use measure_types::{Party, RuleId, Visibility};

/// Write capacity batching bound for the oblivious store (§4.E "Oblivious bucketing").
const ORAM_MAX_BATCH_SIZE: usize = 128;

/// Runs the aggregation game for one party over a configured shard range.
#[derive(Parser, Debug)]
struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    /// The single attribution rule whose outcomes get aggregated.
    #[clap(long, env = "MEASURE_ATTRIBUTION_RULES", default_value = "last_click_1d")]
    attribution_rule: String,

    /// Comma-separated aggregator names; currently only `measurement` is implemented (§6).
    #[clap(long, env = "MEASURE_AGGREGATORS", value_delimiter = ',', default_value = "measurement")]
    aggregators: Vec<String>,

    /// Reveal visibility: `0` public, `1` publisher-only, `2` partner-only (§6).
    #[clap(long, env = "MEASURE_VISIBILITY", default_value_t = 0)]
    visibility: u8,
}

fn main() -> Result<ExitCode> {
    measure_orchestrator::init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(stats) => {
            tracing::info!(?stats, "aggregation game complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!("{err:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(args: &Args) -> Result<ShardStats> {
    let party = args.common.party()?;
    let rule_id = RuleId::from_name(&args.attribution_rule)
        .wrap_err_with(|| format!("unknown attribution rule '{}'", args.attribution_rule))?;
    for name in &args.aggregators {
        if name != "measurement" {
            eyre::bail!("unsupported aggregator '{name}'; only 'measurement' is implemented");
        }
    }
    let visibility = Visibility::from_cli_code(args.visibility)
        .ok_or_else(|| eyre::eyre!("visibility must be 0, 1 or 2, got {}", args.visibility))?;

    measure_orchestrator::run_sharded(&args.common, |shard_index, _worker_port| {
        process_shard(args, party, rule_id, visibility, shard_index)
    })
}

fn process_shard(
    args: &Args,
    party: Party,
    rule_id: RuleId,
    visibility: Visibility,
    shard_index: usize,
) -> Result<ShardStats> {
    let input_path = args.common.input_path(shard_index);
    let raw_rows = parse_attribution_csv(&input_path)
        .wrap_err_with(|| format!("reading attribution shard {}", input_path.display()))?;

    let users_touchpoints = raw_rows
        .iter()
        .map(|raw| raw.to_plaintext_touchpoints(args.common.max_num_touchpoints))
        .collect::<measure_types::Result<Vec<_>>>()?;
    let users_conversions = raw_rows
        .iter()
        .map(|raw| raw.to_plaintext_conversions(args.common.max_num_conversions))
        .collect::<measure_types::Result<Vec<_>>>()?;

    let compressed = compress_ad_ids_across_users(users_touchpoints)?;
    let mut backend = LocalBackend::new(party);
    let rule = rule_by_id::<LocalBackend>(rule_id)?;

    let mut all_outcomes = Vec::new();
    let mut all_conv_values = Vec::new();
    let mut non_free_gates: u64 = 0;

    for (touchpoints, conversions) in compressed.relabeled_users.iter().zip(users_conversions.iter()) {
        let sec_touchpoints: Vec<_> = touchpoints
            .iter()
            .map(|tp| SecTouchpoint::from_plaintext(&mut backend, Party::Publisher, tp))
            .collect();
        let sec_conversions: Vec<_> = conversions
            .iter()
            .map(|conv| SecConversion::from_plaintext(&mut backend, Party::Partner, conv))
            .collect();

        let outcomes = attribute_reverse_scan(rule.as_ref(), &sec_touchpoints, &sec_conversions, &mut backend)?;
        non_free_gates += (sec_touchpoints.len() * sec_conversions.len()) as u64;

        for conv in conversions {
            all_conv_values.push(SecValue::from_plaintext(
                &mut backend,
                Party::Partner,
                Width::U32,
                conv.conv_value as u64,
            ));
        }
        all_outcomes.extend(outcomes);
    }

    let mut store = LocalObliviousStore::new(&mut backend, compressed.mapping.mapping.len(), ORAM_MAX_BATCH_SIZE);
    aggregate(&mut store, &all_outcomes, &all_conv_values, &mut backend)?;
    non_free_gates += all_outcomes.len() as u64;

    let result = reveal(&mut store, &compressed.mapping, visibility, &mut backend)?;
    let wire = MeasurementAggregate::from_result(&result);

    let output_path = args.common.output_path(shard_index);
    let body = serde_json::to_vec_pretty(&wire)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&output_path, &body).wrap_err_with(|| format!("writing {}", output_path.display()))?;

    let sidecar_path = output_path.with_file_name(format!(
        "{}_ad_id_map.json",
        output_path.file_stem().unwrap_or_default().to_string_lossy()
    ));
    fs::write(&sidecar_path, serde_json::to_vec_pretty(&compressed.mapping)?)
        .wrap_err_with(|| format!("writing {}", sidecar_path.display()))?;

    Ok(ShardStats::for_shard(non_free_gates, body.len()))
}
