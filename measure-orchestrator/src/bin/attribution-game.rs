//! The attribution game binary (§4.D, §6): reads one shard of the attribution input CSV per
//! file-range entry, runs every requested rule over every user's touchpoints/conversions, and
//! writes the attribution result JSON (§6, two output formats).

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use eyre::{Context, Result};

use measure_attribution::{attribute_reverse_scan, rule_by_id, SecConversion, SecTouchpoint};
use measure_core::local::LocalBackend;
use measure_orchestrator::{CommonArgs, ShardStats};
use measure_types::attribution::{AttributionBit, AttributionOutputFormat, AttributionReformatted};
use measure_types::csv_io::parse_attribution_csv;
use measure_types::{Party, RuleId};

/// Runs the attribution game for one party over a configured shard range.
#[derive(Parser, Debug)]
struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    /// Comma-separated attribution rule names to evaluate (§4.C). Publisher-authoritative in a
    /// real deployment — see [`measure_attribution::RuleSelection`] for the in-protocol reveal
    /// this flag stands in for here, since this binary runs each party as its own process with
    /// no network agent between them.
    #[clap(long, env = "MEASURE_ATTRIBUTION_RULES", value_delimiter = ',', default_value = "last_click_1d")]
    attribution_rules: Vec<String>,

    /// `0` emits one `isAttributed` bit per conversion; `1` emits the reformatted
    /// `{adId, convValue, isAttributed}` record (§6).
    #[clap(long, env = "MEASURE_OUTPUT_FORMAT", default_value_t = 0)]
    output_format: u8,
}

fn main() -> Result<ExitCode> {
    measure_orchestrator::init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(stats) => {
            tracing::info!(?stats, "attribution game complete");
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
    let format = if args.output_format == 0 {
        AttributionOutputFormat::Default
    } else {
        AttributionOutputFormat::Reformatted
    };

    let rule_ids = args
        .attribution_rules
        .iter()
        .map(|name| RuleId::from_name(name).wrap_err_with(|| format!("unknown attribution rule '{name}'")))
        .collect::<Result<Vec<_>>>()?;
    if rule_ids.is_empty() {
        eyre::bail!("attribution_rules must name at least one rule");
    }

    measure_orchestrator::run_sharded(&args.common, |shard_index, _worker_port| {
        process_shard(args, party, &rule_ids, format, shard_index)
    })
}

fn process_shard(
    args: &Args,
    party: Party,
    rule_ids: &[RuleId],
    format: AttributionOutputFormat,
    shard_index: usize,
) -> Result<ShardStats> {
    let input_path = args.common.input_path(shard_index);
    let raw_rows = parse_attribution_csv(&input_path)
        .wrap_err_with(|| format!("reading attribution shard {}", input_path.display()))?;

    let mut backend = LocalBackend::new(party);
    let mut non_free_gates: u64 = 0;
    let mut default_bits = Vec::new();
    let mut reformatted = Vec::new();

    for raw in &raw_rows {
        let touchpoints = raw.to_plaintext_touchpoints(args.common.max_num_touchpoints)?;
        let conversions = raw.to_plaintext_conversions(args.common.max_num_conversions)?;

        let sec_touchpoints: Vec<_> = touchpoints
            .iter()
            .map(|tp| SecTouchpoint::from_plaintext(&mut backend, Party::Publisher, tp))
            .collect();
        let sec_conversions: Vec<_> = conversions
            .iter()
            .map(|conv| SecConversion::from_plaintext(&mut backend, Party::Partner, conv))
            .collect();

        for &rule_id in rule_ids {
            let rule = rule_by_id::<LocalBackend>(rule_id)?;
            let outcomes =
                attribute_reverse_scan(rule.as_ref(), &sec_touchpoints, &sec_conversions, &mut backend)?;
            non_free_gates += (sec_touchpoints.len() * sec_conversions.len()) as u64;

            for (outcome, conv) in outcomes.iter().zip(conversions.iter()) {
                let is_attributed = outcome.is_attributed.open_to_party(party, &mut backend)? != 0;
                match format {
                    AttributionOutputFormat::Default => default_bits.push(AttributionBit { is_attributed }),
                    AttributionOutputFormat::Reformatted => {
                        let ad_id = outcome.winner_ad_id.open_to_party(party, &mut backend)? as u16;
                        reformatted.push(AttributionReformatted {
                            ad_id,
                            conv_value: conv.conv_value,
                            is_attributed,
                        });
                    }
                }
            }
        }
    }

    let output_path = args.common.output_path(shard_index);
    let body = match format {
        AttributionOutputFormat::Default => serde_json::to_vec_pretty(&default_bits)?,
        AttributionOutputFormat::Reformatted => serde_json::to_vec_pretty(&reformatted)?,
    };
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&output_path, &body).wrap_err_with(|| format!("writing {}", output_path.display()))?;

    Ok(ShardStats::for_shard(non_free_gates, body.len()))
}
