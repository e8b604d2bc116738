//! The shard combiner binary (§4.G, §6): sums `num_files` metric-tree shards from
//! `input_base_path`, applies the k-anonymity threshold gate when the combined tree is
//! lift-shaped, and reveals the result to `output_base_path`.
//!
//! Unlike the other three binaries, combining is a reduction across many shard files into one
//! output, not independent per-shard work — so it does not go through
//! [`measure_orchestrator::run_sharded`]'s disjoint-sub-range fan-out; `concurrency` is accepted
//! for CLI uniformity (§6) but unused here.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use eyre::{Context, Result};

use measure_combiner::{combine_shards, gate_grouped_lift_tree, reveal_tree};
use measure_core::local::LocalBackend;
use measure_orchestrator::{CommonArgs, ShardStats};
use measure_types::combiner::MetricNode;
use measure_types::{MeasurementError, Party, Visibility};

/// Runs the shard combiner for one party over `num_files` input shards.
#[derive(Parser, Debug)]
struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    /// k-anonymity threshold gate (§4.G, lift shards only).
    #[clap(long, env = "MEASURE_THRESHOLD", default_value_t = 100)]
    threshold: i64,

    /// Reveal visibility: `0` public, `1` publisher-only, `2` partner-only (§6).
    #[clap(long, env = "MEASURE_VISIBILITY", default_value_t = 0)]
    visibility: u8,
}

fn main() -> Result<ExitCode> {
    measure_orchestrator::init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(stats) => {
            tracing::info!(?stats, "shard combiner complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!("{err:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(args: &Args) -> Result<ShardStats> {
    args.common.validate()?;
    let party = args.common.party()?;
    let visibility = Visibility::from_cli_code(args.visibility)
        .ok_or_else(|| eyre::eyre!("visibility must be 0, 1 or 2, got {}", args.visibility))?;

    let mut shards = Vec::with_capacity(args.common.num_files);
    for i in 0..args.common.num_files {
        let shard_index = args.common.file_start_index + i;
        let path = args.common.input_path(shard_index);
        let raw = fs::read(&path).wrap_err_with(|| format!("reading shard {}", path.display()))?;
        let tree: MetricNode =
            serde_json::from_slice(&raw).wrap_err_with(|| format!("parsing shard {}", path.display()))?;
        shards.push(tree);
    }

    let combined = combine_shards(shards)?;

    let mut backend = LocalBackend::new(party);
    let gated = match gate_grouped_lift_tree(&combined, args.threshold, &mut backend) {
        Ok(gated) => gated,
        Err(MeasurementError::Schema(_)) => {
            tracing::debug!("combined tree is not lift-shaped; skipping the threshold gate");
            combined
        }
        Err(err) => return Err(err.into()),
    };

    let revealed = reveal_tree(&gated, visibility, &mut backend)?;

    let output_path = args.common.output_path(args.common.file_start_index);
    let body = serde_json::to_vec_pretty(&revealed)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&output_path, &body).wrap_err_with(|| format!("writing {}", output_path.display()))?;

    Ok(ShardStats::for_shard(0, body.len()))
}
