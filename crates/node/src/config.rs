//! Node Configuration

use crate::ConfigError;
use alloy_primitives::B256;
use rollup_types::{BlockId, Genesis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "terminal" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Log(format!("unrecognized log format {:?}", other))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (trace, debug, info, warn, error, off)
    pub level: String,
    pub format: LogFormat,
    /// Colorize text output
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
        }
    }
}

impl LogConfig {
    /// Verify that the level can be used as a filter
    pub fn check(&self) -> Result<(), ConfigError> {
        self.level_filter().map(|_| ())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::Log(format!("unrecognized log level {:?}", self.level)))
    }
}

/// Timing and sizing of the node runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bound on each engine's initial head query
    #[serde(rename = "bootstrap_timeout_ms", with = "millis")]
    pub bootstrap_timeout: Duration,
    /// Wait between a failed L1 head subscription and the next attempt
    #[serde(rename = "resubscribe_interval_ms", with = "millis")]
    pub resubscribe_interval: Duration,
    /// Capacity of every head fanout output
    pub head_buffer: usize,
    /// Parallel receipt download workers
    pub receipt_workers: usize,
    #[serde(rename = "dial_timeout_ms", with = "millis")]
    pub dial_timeout: Duration,
    /// Head polling interval for HTTP L1 endpoints
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout: Duration::from_secs(10),
            resubscribe_interval: Duration::from_secs(10),
            head_buffer: 10,
            receipt_workers: 4,
            dial_timeout: rollup_rpc::DEFAULT_RPC_TIMEOUT,
            poll_interval: l1_source::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// L1 JSON-RPC endpoints (eth namespace required)
    pub l1_node_addrs: Vec<String>,
    /// L2 engine JSON-RPC endpoints (engine and eth namespace required)
    pub l2_engine_addrs: Vec<String>,
    /// Genesis block hash of L2
    pub l2_hash: B256,
    /// L1 block after (not including) which L2 blocks are derived
    pub l1_hash: B256,
    /// Number of the block matching `l1_hash`
    pub l1_num: u64,
    pub log: LogConfig,
    pub runtime: RuntimeConfig,
}

impl NodeConfig {
    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Verify that the configuration makes sense
    pub fn check(&self) -> Result<(), ConfigError> {
        self.log.check()?;
        if self.l1_node_addrs.is_empty() {
            return Err(ConfigError::NoL1Endpoints);
        }
        Ok(())
    }

    pub fn genesis(&self) -> Genesis {
        Genesis {
            l1: BlockId::new(self.l1_hash, self.l1_num),
            // A squashed snapshot start would need a non-zero L2 genesis number
            l2: BlockId::new(self.l2_hash, 0),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config() -> NodeConfig {
        NodeConfig {
            l1_node_addrs: vec!["ws://127.0.0.1:8546".to_string()],
            l2_hash: B256::repeat_byte(2),
            l1_hash: B256::repeat_byte(1),
            l1_num: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_genesis_from_config() {
        let genesis = config().genesis();
        assert_eq!(genesis.l1, BlockId::new(B256::repeat_byte(1), 42));
        assert_eq!(genesis.l2, BlockId::new(B256::repeat_byte(2), 0));
    }

    #[test]
    fn test_check_rejects_bad_config() {
        assert!(config().check().is_ok());

        let mut no_l1 = config();
        no_l1.l1_node_addrs.clear();
        assert!(matches!(no_l1.check(), Err(ConfigError::NoL1Endpoints)));

        let mut bad_log = config();
        bad_log.log.level = "loud".to_string();
        let err = bad_log.check().unwrap_err();
        assert!(err.to_string().starts_with("error checking log sub-config"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("terminal".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "l1_node_addrs": ["http://127.0.0.1:8545"],
                "l2_engine_addrs": ["http://127.0.0.1:9545", "http://127.0.0.1:9546"],
                "l1_num": 7,
                "log": {{ "level": "debug", "format": "json" }},
                "runtime": {{ "bootstrap_timeout_ms": 250 }}
            }}"#
        )
        .unwrap();

        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.l2_engine_addrs.len(), 2);
        assert_eq!(config.l1_num, 7);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.log.color);
        assert_eq!(config.runtime.bootstrap_timeout, Duration::from_millis(250));
        assert_eq!(config.runtime.resubscribe_interval, Duration::from_secs(10));
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
