//! Exercises `measure_orchestrator`'s shard fan-out against synthetic attribution shards from
//! `measure-test-utils`, the same fixture crate `measure-orchestrator`'s demo binaries are built
//! to consume (§4.H, §6).

use std::fs;

use eyre::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use measure_attribution::{attribute_reverse_scan, rule_by_id, SecConversion, SecTouchpoint};
use measure_core::local::LocalBackend;
use measure_orchestrator::CommonArgs;
use measure_types::csv_io::parse_attribution_csv;
use measure_types::{Party, RuleId};
use measure_test_utils::synthetic_attribution_csv;

fn common_args(dir: &std::path::Path, num_files: usize) -> CommonArgs {
    CommonArgs {
        party: 1,
        server_ip: "127.0.0.1".parse().unwrap(),
        port: 10_000,
        input_base_path: dir.join("shard.csv"),
        output_base_path: dir.join("shard.json"),
        file_start_index: 0,
        num_files,
        use_postfix: true,
        concurrency: 2,
        use_xor_encryption: false,
        input_encryption: 0,
        max_num_touchpoints: 4,
        max_num_conversions: 4,
        use_tls: false,
        tls_dir: None,
    }
}

#[test]
fn fans_out_synthetic_attribution_shards_across_workers() {
    let dir = std::env::temp_dir().join(format!("measure_orchestrator_test_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let num_files = 3;
    for shard_index in 0..num_files {
        let csv = synthetic_attribution_csv(&mut rng, 4, 2);
        fs::write(dir.join(format!("shard_{shard_index}.csv")), csv).unwrap();
    }

    let common = common_args(&dir, num_files);
    let rule_id = RuleId::LAST_CLICK_1D;
    let party = Party::Publisher;

    let stats = measure_orchestrator::run_sharded(&common, |shard_index, _worker_port| {
        let input_path = common.input_path(shard_index);
        let raw_rows = parse_attribution_csv(&input_path)?;

        let mut backend = LocalBackend::new(party);
        let rule = rule_by_id::<LocalBackend>(rule_id)?;
        let mut non_free_gates: u64 = 0;
        let mut attributed_count = 0u64;

        for raw in &raw_rows {
            let touchpoints = raw.to_plaintext_touchpoints(common.max_num_touchpoints)?;
            let conversions = raw.to_plaintext_conversions(common.max_num_conversions)?;
            let sec_touchpoints: Vec<_> = touchpoints
                .iter()
                .map(|tp| SecTouchpoint::from_plaintext(&mut backend, Party::Publisher, tp))
                .collect();
            let sec_conversions: Vec<_> = conversions
                .iter()
                .map(|conv| SecConversion::from_plaintext(&mut backend, Party::Partner, conv))
                .collect();
            let outcomes =
                attribute_reverse_scan(rule.as_ref(), &sec_touchpoints, &sec_conversions, &mut backend)?;
            non_free_gates += (sec_touchpoints.len() * sec_conversions.len()) as u64;
            for outcome in &outcomes {
                attributed_count += outcome.is_attributed.open_to_party(party, &mut backend)?;
            }
        }

        let output_path = common.output_path(shard_index);
        fs::write(&output_path, attributed_count.to_string())
            .wrap_err_with(|| format!("writing {}", output_path.display()))?;

        Ok(measure_orchestrator::ShardStats::for_shard(non_free_gates, 0))
    })
    .unwrap();

    assert!(stats.non_free_gate_count > 0);
    for shard_index in 0..num_files {
        let output_path = common.output_path(shard_index);
        let attributed: u64 = fs::read_to_string(&output_path).unwrap().parse().unwrap();
        // Every synthetic conversion lands inside its last touchpoint's 1-day window.
        assert_eq!(attributed, 4);
    }

    fs::remove_dir_all(&dir).unwrap();
}
