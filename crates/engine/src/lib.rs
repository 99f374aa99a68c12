//! Rollup Engine - keeps execution engines in sync with the L1 head
//!
//! Architecture:
//! - [`EngineApi`] reaches one execution engine over JSON-RPC
//! - [`SyncSource`] finds where an engine stands relative to L1
//! - [`EngineDriver`] owns an engine and its [`EngineDriverState`], and
//!   consumes a stream of L1 head signals until unsubscribed

pub mod client;
pub mod driver;
pub mod error;
pub mod state;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{EngineApi, RpcEngineClient};
pub use driver::{Driver, EngineDriver};
pub use error::{DriverError, EngineError, SyncError};
pub use state::{EngineDriverState, EngineHeads};
pub use sync::SyncSource;
