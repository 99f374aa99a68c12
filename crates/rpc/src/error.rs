//! RPC errors

use crate::client::TransportKind;
use jsonrpsee::core::ClientError;
use std::time::Duration;
use thiserror::Error;

/// Errors from dialing or calling a JSON-RPC endpoint
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("unsupported endpoint address {0:?}, expected http(s):// or ws(s)://")]
    UnsupportedAddress(String),

    #[error("rpc client error: {0}")]
    Client(#[from] ClientError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("subscriptions are not supported over {0}")]
    SubscriptionsUnsupported(TransportKind),

    #[error("client closed")]
    Closed,
}
