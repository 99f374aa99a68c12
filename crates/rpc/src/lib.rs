//! RPC client - JSON-RPC transport for L1 and engine endpoints
//!
//! Provides:
//! - [`RpcClient`]: HTTP or WebSocket JSON-RPC client that re-establishes a
//!   dropped WebSocket transport on the next request
//! - [`dial`]: endpoint resolution that tells a usable-but-disconnected
//!   handle apart from an outright failure
//! - [`eth`]: the `eth` namespace calls shared by L1 and L2 clients

pub mod client;
pub mod error;
pub mod eth;

pub use client::{dial, Dialed, RpcClient, TransportKind};
pub use error::RpcError;
pub use eth::BlockTag;

use std::time::Duration;

/// Timeout for establishing a connection and for each request
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);
