//! L1 Source - read access to the base chain
//!
//! Handles communication with the L1 endpoints:
//! - Reading headers and receipts over JSON-RPC
//! - Failing over between redundant endpoints
//! - Watching head changes and turning them into [`HeadSignal`]s
//! - Fetching receipts with a pool of parallel workers
//!
//! [`HeadSignal`]: rollup_types::HeadSignal

pub mod canonical;
pub mod combined;
pub mod downloader;
pub mod error;
pub mod heads;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use canonical::CanonicalChain;
pub use combined::CombinedL1Source;
pub use downloader::{DownloadError, Downloader};
pub use error::L1SourceError;
pub use heads::watch_head_changes;
pub use source::{HeadStream, L1Source, RpcL1Client};

/// Interval between latest-head polls on transports without subscriptions
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(4);
