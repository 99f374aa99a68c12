//! Engine errors

use l1_source::L1SourceError;
use rollup_rpc::RpcError;
use rollup_types::BlockId;
use thiserror::Error;

/// Errors talking to an execution engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Rpc(RpcError),

    #[error("engine returned no head block")]
    HeadNotFound,

    #[error("engine connection closed")]
    Closed,
}

impl From<RpcError> for EngineError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Closed => Self::Closed,
            other => Self::Rpc(other),
        }
    }
}

/// Errors locating an engine's head relative to L1
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    L1(#[from] L1SourceError),

    #[error("engine head {head} is below the L2 genesis {genesis}")]
    BelowGenesis { head: BlockId, genesis: BlockId },

    #[error("engine block {found} does not match the L2 genesis {expected}")]
    GenesisMismatch { expected: BlockId, found: BlockId },
}

/// Errors reported by a driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DriverError {
    /// Whether the engine can no longer be driven at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Engine(EngineError::Closed) | Self::Sync(SyncError::Engine(EngineError::Closed))
        )
    }
}
