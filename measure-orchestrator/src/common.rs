//! Shared CLI surface (§6 "CLI flags (common across binaries)").
//!
//! Every binary in this crate flattens [`CommonArgs`] into its own `clap::Parser` struct via
//! `#[clap(flatten)]` and adds whichever game-specific flags that binary alone needs
//! (`attribution_rules`, `aggregators`, `visibility`, `threshold`, ...), the same layering
//! `OprfNodeConfig` uses for node-wide vs. command-specific flags.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::Args;
use eyre::{bail, Result};
use measure_types::{InputEncryption, Party};

/// CLI flags every game binary accepts (§6).
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Which party this process runs as: `1` (publisher) or `2` (partner).
    #[clap(long, env = "MEASURE_PARTY")]
    pub party: u8,

    /// IP address of the other party's agent.
    #[clap(long, env = "MEASURE_SERVER_IP", default_value = "127.0.0.1")]
    pub server_ip: IpAddr,

    /// Base port this worker's agent listens on; worker `w` offsets by `100 * w` (§4.H, §6).
    #[clap(long, env = "MEASURE_PORT", default_value_t = 10_000)]
    pub port: u16,

    /// Directory holding input shard files.
    #[clap(long, env = "MEASURE_INPUT_BASE_PATH")]
    pub input_base_path: PathBuf,

    /// Directory output shard files are written to.
    #[clap(long, env = "MEASURE_OUTPUT_BASE_PATH")]
    pub output_base_path: PathBuf,

    /// Index of the first shard to process.
    #[clap(long, env = "MEASURE_FILE_START_INDEX", default_value_t = 0)]
    pub file_start_index: usize,

    /// Number of shards to process, starting at `file_start_index`.
    #[clap(long, env = "MEASURE_NUM_FILES", default_value_t = 1)]
    pub num_files: usize,

    /// Append `_<shard index>` to input/output file stems instead of reading/writing one bare
    /// file per run.
    #[clap(long, env = "MEASURE_USE_POSTFIX")]
    pub use_postfix: bool,

    /// Number of OS-thread workers processing disjoint shard sub-ranges (§4.H, §5), `1..=16`.
    #[clap(long, env = "MEASURE_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Whether sensitive input columns are pre-XOR-shared rather than plaintext (legacy flag;
    /// superseded by `input_encryption` but still accepted per §6).
    #[clap(long, env = "MEASURE_USE_XOR_ENCRYPTION")]
    pub use_xor_encryption: bool,

    /// Input encryption mode: `0` plaintext, `1` partner-xor, `2` xor (§3, §6).
    #[clap(long, env = "MEASURE_INPUT_ENCRYPTION", default_value_t = 0)]
    pub input_encryption: u8,

    /// Per-user touchpoint capacity (§6 `max_num_touchpoints`).
    #[clap(long, env = "MEASURE_MAX_NUM_TOUCHPOINTS", default_value_t = 4)]
    pub max_num_touchpoints: usize,

    /// Per-user conversion capacity (§6 `max_num_conversions`).
    #[clap(long, env = "MEASURE_MAX_NUM_CONVERSIONS", default_value_t = 4)]
    pub max_num_conversions: usize,

    /// Use TLS for the inter-party agent connection.
    #[clap(long, env = "MEASURE_USE_TLS")]
    pub use_tls: bool,

    /// Directory holding TLS certificate/key material, required when `use_tls` is set.
    #[clap(long, env = "MEASURE_TLS_DIR")]
    pub tls_dir: Option<PathBuf>,
}

impl CommonArgs {
    /// Resolves `party` to a [`Party`], or a fatal config error (§7: bad config is fatal, not
    /// retried).
    pub fn party(&self) -> Result<Party> {
        Party::from_id(self.party).ok_or_else(|| eyre::eyre!("party must be 1 or 2, got {}", self.party))
    }

    /// Resolves `input_encryption` to an [`InputEncryption`].
    pub fn input_encryption(&self) -> Result<InputEncryption> {
        InputEncryption::from_cli_code(self.input_encryption)
            .ok_or_else(|| eyre::eyre!("input_encryption must be 0, 1 or 2, got {}", self.input_encryption))
    }

    /// Validates `concurrency` is in range and TLS flags are consistent; called once before any
    /// worker is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > 16 {
            bail!("concurrency must be in 1..=16, got {}", self.concurrency);
        }
        if self.use_tls && self.tls_dir.is_none() {
            bail!("use_tls requires tls_dir");
        }
        Ok(())
    }

    /// The input path for shard `index`, honoring `use_postfix` (§6).
    pub fn input_path(&self, index: usize) -> PathBuf {
        shard_path(&self.input_base_path, index, self.use_postfix)
    }

    /// The output path for shard `index`, honoring `use_postfix` (§6).
    pub fn output_path(&self, index: usize) -> PathBuf {
        shard_path(&self.output_base_path, index, self.use_postfix)
    }

    /// The worker port for sub-range worker `worker_index` (§4.H: "own socket agent factory on a
    /// port offset `base + 100 * workerIndex`").
    pub fn worker_port(&self, worker_index: usize) -> u16 {
        self.port + 100 * worker_index as u16
    }
}

fn shard_path(base: &Path, index: usize, use_postfix: bool) -> PathBuf {
    if !use_postfix {
        return base.to_path_buf();
    }
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let postfixed = match base.extension() {
        Some(ext) => format!("{stem}_{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index}"),
    };
    base.with_file_name(postfixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_path_without_postfix_is_unchanged() {
        let base = PathBuf::from("/data/input.csv");
        assert_eq!(shard_path(&base, 3, false), base);
    }

    #[test]
    fn shard_path_with_postfix_inserts_before_extension() {
        let base = PathBuf::from("/data/input.csv");
        assert_eq!(shard_path(&base, 3, true), PathBuf::from("/data/input_3.csv"));
    }

    #[test]
    fn shard_path_with_postfix_and_no_extension() {
        let base = PathBuf::from("/data/input");
        assert_eq!(shard_path(&base, 2, true), PathBuf::from("/data/input_2"));
    }

    #[test]
    fn worker_port_offsets_by_100() {
        let args = CommonArgs {
            party: 1,
            server_ip: "127.0.0.1".parse().unwrap(),
            port: 9000,
            input_base_path: PathBuf::new(),
            output_base_path: PathBuf::new(),
            file_start_index: 0,
            num_files: 1,
            use_postfix: false,
            concurrency: 1,
            use_xor_encryption: false,
            input_encryption: 0,
            max_num_touchpoints: 4,
            max_num_conversions: 4,
            use_tls: false,
            tls_dir: None,
        };
        assert_eq!(args.worker_port(0), 9000);
        assert_eq!(args.worker_port(2), 9200);
    }
}
