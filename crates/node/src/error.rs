//! Node errors

use l1_source::L1SourceError;
use rollup_engine::DriverError;
use rollup_rpc::RpcError;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or insufficient configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error checking log sub-config: {0}")]
    Log(String),

    #[error("need at least one L1 source endpoint, see --l1")]
    NoL1Endpoints,

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that keep the node from starting
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to dial L1 address {index} ({addr}): {source}")]
    EndpointUnavailable {
        index: usize,
        addr: String,
        #[source]
        source: RpcError,
    },

    #[error("node already stopped")]
    Stopped,
}

/// One failed teardown step
#[derive(Error, Debug)]
pub enum TeardownError {
    #[error("failed to close L1 source: {0}")]
    L1Source(#[from] L1SourceError),

    #[error("failed to close engine {index}: {source}")]
    Engine {
        index: usize,
        #[source]
        source: DriverError,
    },

    #[error("subscription error listener failed: {0}")]
    Listener(#[from] tokio::task::JoinError),

    #[error("lifecycle coordinator exited before replying")]
    Coordinator,
}

/// Every error hit during teardown, in teardown order
#[derive(Error, Debug)]
#[error("{} teardown step(s) failed, first: {}", .errors.len(), .errors[0])]
pub struct ShutdownError {
    errors: Vec<TeardownError>,
}

impl ShutdownError {
    /// `Ok` when `errors` is empty
    pub fn from_errors(errors: Vec<TeardownError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    pub fn first(&self) -> &TeardownError {
        &self.errors[0]
    }

    pub fn errors(&self) -> &[TeardownError] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_error_keeps_order() {
        assert!(ShutdownError::from_errors(Vec::new()).is_ok());

        let err = ShutdownError::from_errors(vec![
            TeardownError::L1Source(L1SourceError::Closed),
            TeardownError::Coordinator,
        ])
        .unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(matches!(err.first(), TeardownError::L1Source(_)));
        assert!(err.to_string().starts_with("2 teardown step(s) failed"));
    }
}
