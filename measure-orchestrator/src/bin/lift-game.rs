//! The lift game binary (§4.F, §6): reads one shard of joined lift rows, folds them into
//! test/control metrics, fans out across publisher breakdowns and partner cohorts, and reveals
//! the grouped result.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use eyre::{Context, Result};

use measure_core::local::LocalBackend;
use measure_lift::{compute_grouped_metrics, LiftConfig, SecUserRow};
use measure_orchestrator::{CommonArgs, ShardStats};
use measure_types::lift::LiftUserRow;
use measure_types::{Party, Visibility};

/// Runs the lift game for one party over a configured shard range.
#[derive(Parser, Debug)]
struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    /// Number of publisher breakdown groups (`0` disables breakdown fan-out).
    #[clap(long, env = "MEASURE_NUM_PUBLISHER_BREAKDOWNS", default_value_t = 0)]
    num_publisher_breakdowns: usize,

    /// Number of partner cohort groups (`0` disables cohort fan-out).
    #[clap(long, env = "MEASURE_NUM_PARTNER_COHORTS", default_value_t = 0)]
    num_partner_cohorts: usize,

    /// Skip value/value² computation (set when the partner omitted the `values` column).
    #[clap(long, env = "MEASURE_SHOULD_SKIP_VALUES")]
    should_skip_values: bool,

    /// Reveal visibility: `0` public, `1` publisher-only, `2` partner-only (§6).
    #[clap(long, env = "MEASURE_VISIBILITY", default_value_t = 0)]
    visibility: u8,
}

fn main() -> Result<ExitCode> {
    measure_orchestrator::init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(stats) => {
            tracing::info!(?stats, "lift game complete");
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
    let visibility = Visibility::from_cli_code(args.visibility)
        .ok_or_else(|| eyre::eyre!("visibility must be 0, 1 or 2, got {}", args.visibility))?;

    let config = LiftConfig {
        num_publisher_breakdowns: args.num_publisher_breakdowns,
        num_partner_cohorts: args.num_partner_cohorts,
        should_skip_values: args.should_skip_values,
        max_conv: args.common.max_num_conversions,
    };

    measure_orchestrator::run_sharded(&args.common, |shard_index, _worker_port| {
        process_shard(args, party, &config, visibility, shard_index)
    })
}

fn process_shard(
    args: &Args,
    party: Party,
    config: &LiftConfig,
    visibility: Visibility,
    shard_index: usize,
) -> Result<ShardStats> {
    let input_path = args.common.input_path(shard_index);
    let raw = fs::read(&input_path).wrap_err_with(|| format!("reading lift shard {}", input_path.display()))?;
    let rows: Vec<LiftUserRow> =
        serde_json::from_slice(&raw).wrap_err_with(|| format!("parsing lift shard {}", input_path.display()))?;

    let mut backend = LocalBackend::new(party);
    let padded = rows
        .into_iter()
        .map(|row| row.pad_purchases(config.max_conv))
        .collect::<measure_types::Result<Vec<_>>>()?;
    let sec_rows: Vec<_> = padded
        .iter()
        .map(|row| SecUserRow::from_plaintext(&mut backend, Party::Publisher, row))
        .collect();

    let grouped = compute_grouped_metrics(&sec_rows, config, &mut backend)?;
    let revealed = grouped.reveal(party, &mut backend)?;

    let row_count = sec_rows.len() as u64;
    let group_count = (config.num_publisher_breakdowns + config.num_partner_cohorts + 1) as u64;
    let non_free_gates = row_count * group_count;

    let output_path = args.common.output_path(shard_index);
    let body = serde_json::to_vec_pretty(&revealed)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&output_path, &body).wrap_err_with(|| format!("writing {}", output_path.display()))?;

    Ok(ShardStats::for_shard(non_free_gates, body.len()))
}
