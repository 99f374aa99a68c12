//! L1 source errors

use rollup_rpc::RpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum L1SourceError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("L1 block {0} not found")]
    BlockNotFound(String),

    #[error("no L1 sources configured")]
    NoSources,

    #[error("L1 head stream error: {0}")]
    Stream(String),

    #[error("L1 source closed")]
    Closed,
}
