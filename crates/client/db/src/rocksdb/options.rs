#![allow(clippy::identity_op)] // allow 1 * MiB
#![allow(non_upper_case_globals)] // allow KiB/MiB/GiB names

use crate::error::DbError;
use rocksdb::{DBCompressionType, Env, Options};

const KiB: usize = 1024;
const MiB: usize = 1024 * KiB;

pub use rocksdb::statistics::StatsLevel;

#[derive(Debug, Clone)]
pub struct RocksDBConfig {
    /// Enable statistics. Statistics will be put in the `LOG` file in the db folder. This can have an effect on performance.
    pub enable_statistics: bool,
    /// Dump statistics every `statistics_period_sec`.
    pub statistics_period_sec: u32,
    /// Statistics level. This can have an effect on performance.
    pub statistics_level: StatsLevel,
    /// Memtable size. Migrations queue all of their writes in the open transaction, this only bounds the
    /// committed side.
    pub write_buffer_size_bytes: usize,
    pub max_open_files: i32,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            enable_statistics: false,
            statistics_period_sec: 60,
            statistics_level: StatsLevel::All,
            write_buffer_size_bytes: 64 * MiB,
            max_open_files: 2048,
        }
    }
}

pub fn rocksdb_global_options(config: &RocksDBConfig) -> Result<Options, DbError> {
    let mut options = Options::default();
    options.create_if_missing(true);
    let cores = std::thread::available_parallelism().map(|e| e.get() as i32).unwrap_or(1);
    options.increase_parallelism(cores);
    options.set_max_background_jobs(cores);
    options.set_max_subcompactions(cores as _);

    options.set_max_log_file_size(10 * MiB);
    options.set_max_open_files(config.max_open_files);
    options.set_keep_log_file_num(3);
    options.set_log_level(rocksdb::LogLevel::Warn);
    options.set_write_buffer_size(config.write_buffer_size_bytes);
    options.set_compression_type(DBCompressionType::Zstd);

    if config.enable_statistics {
        options.enable_statistics();
        options.set_statistics_level(config.statistics_level);
    }
    options.set_stats_dump_period_sec(config.statistics_period_sec);

    let mut env = Env::new()?;
    env.set_low_priority_background_threads(cores); // compaction

    options.set_env(&env);

    Ok(options)
}
