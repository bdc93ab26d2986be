use serde::Deserialize;

use crate::error::Result;
use crate::storage::DiskType;

#[derive(Debug, PartialEq, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub disk_type: DiskType,
    /// Number of frames in the buffer pool.
    pub pool_size: usize,
    /// The K in the LRU-K replacement policy.
    pub replacer_k: usize,
}

impl Config {
    /// Load configuration from defaults, then an optional file, then
    /// `PAGEBUF`-prefixed environment variables, each layer overriding the
    /// previous one.
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("disk_type", "memory")?
            .set_default("log_level", "debug")?
            .set_default("pool_size", 1024)?
            .set_default("replacer_k", 2)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGEBUF"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}
