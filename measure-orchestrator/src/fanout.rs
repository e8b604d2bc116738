//! Shard fan-out across OS threads (§4.H, §5: "OS-level parallel threads across shards, each
//! owning an independent scheduler").
//!
//! Each worker is handed a disjoint, contiguous sub-range of the `[file_start_index,
//! file_start_index + num_files)` shard range and its own port offset, then runs its shards
//! sequentially within that sub-range — mirroring how `oprf-dev-client`'s stress-test harness
//! spreads fixed work across a bounded pool rather than spawning one task per item.

use std::thread;

use eyre::Result;

use crate::common::CommonArgs;
use crate::stats::ShardStats;

/// Runs `process_shard(shard_index, worker_port)` for every shard in `common`'s configured
/// range, split across `common.concurrency` worker threads, and sums the resulting [`ShardStats`].
///
/// `process_shard` must be `Sync` since every worker thread borrows it; it is not `Send` itself
/// (only invoked by reference), so it may close over non-thread-safe setup state built once
/// before fan-out.
pub fn run_sharded<F>(common: &CommonArgs, process_shard: F) -> Result<ShardStats>
where
    F: Fn(usize, u16) -> Result<ShardStats> + Sync,
{
    common.validate()?;

    let shard_indices: Vec<usize> =
        (common.file_start_index..common.file_start_index + common.num_files).collect();
    if shard_indices.is_empty() {
        eyre::bail!("num_files must be at least 1");
    }
    let worker_count = common.concurrency.min(shard_indices.len());
    let chunks = partition(&shard_indices, worker_count);

    let results: Vec<Result<ShardStats>> = thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(worker_index, chunk)| {
                let process_shard = &process_shard;
                let port = common.worker_port(worker_index);
                scope.spawn(move || -> Result<ShardStats> {
                    let mut stats = ShardStats::default();
                    for &shard in chunk {
                        tracing::info!(shard, worker_index, port, "processing shard");
                        stats += process_shard(shard, port)?;
                    }
                    Ok(stats)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("shard worker thread panicked")).collect()
    });

    results.into_iter().try_fold(ShardStats::default(), |mut acc, r| {
        acc += r?;
        Ok(acc)
    })
}

/// Splits `items` into at most `worker_count` contiguous, near-equal sub-ranges.
fn partition(items: &[usize], worker_count: usize) -> Vec<&[usize]> {
    if worker_count == 0 {
        return vec![];
    }
    let base = items.len() / worker_count;
    let remainder = items.len() % worker_count;
    let mut chunks = Vec::with_capacity(worker_count);
    let mut offset = 0;
    for worker_index in 0..worker_count {
        let size = base + usize::from(worker_index < remainder);
        chunks.push(&items[offset..offset + size]);
        offset += size;
    }
    chunks
}
