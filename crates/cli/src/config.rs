//! Command line flags

use alloy_primitives::B256;
use clap::Parser;
use rollup_node::{ConfigError, LogFormat, NodeConfig};
use std::path::PathBuf;

/// Rollup consensus-layer node
#[derive(Parser, Debug)]
#[command(name = "rollup-node")]
#[command(about = "Keeps L2 execution engines in sync with the L1 chain", long_about = None)]
pub struct Args {
    /// JSON config file. Flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// L1 JSON-RPC endpoints (eth namespace required)
    #[arg(long = "l1", value_delimiter = ',')]
    pub l1: Vec<String>,

    /// L2 engine JSON-RPC endpoints (engine and eth namespace required)
    #[arg(long = "l2", value_delimiter = ',')]
    pub l2: Vec<String>,

    /// Genesis block hash of L2
    #[arg(long = "genesis.l2-hash")]
    pub l2_hash: Option<B256>,

    /// Block hash of L1 after (not including) which L2 blocks are derived
    #[arg(long = "genesis.l1-hash")]
    pub l1_hash: Option<B256>,

    /// Block number of L1 matching the genesis L1 hash
    #[arg(long = "genesis.l1-num")]
    pub l1_num: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log.level")]
    pub log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long = "log.format")]
    pub log_format: Option<LogFormat>,

    /// Colorize text logs
    #[arg(long = "log.color")]
    pub log_color: Option<bool>,
}

impl Args {
    /// Resolve the node configuration
    pub fn into_config(self) -> Result<NodeConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        };

        if !self.l1.is_empty() {
            config.l1_node_addrs = self.l1;
        }
        if !self.l2.is_empty() {
            config.l2_engine_addrs = self.l2;
        }
        if let Some(hash) = self.l2_hash {
            config.l2_hash = hash;
        }
        if let Some(hash) = self.l1_hash {
            config.l1_hash = hash;
        }
        if let Some(num) = self.l1_num {
            config.l1_num = num;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
        if let Some(color) = self.log_color {
            config.log.color = color;
        }

        config.check()?;
        Ok(config)
    }
}
