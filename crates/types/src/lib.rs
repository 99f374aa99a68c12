//! Shared types for the rollup node
//!
//! Block references exchanged between the L1 source, the execution engines
//! and the node runtime, plus the cancelable [`Subscription`] handle every
//! long-lived feed is built on.

pub mod subscription;

pub use subscription::{Subscription, SubscriptionError};

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Reference to a block on either chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// Block hash
    pub hash: B256,
    /// Block number
    pub number: u64,
}

impl BlockId {
    pub const fn new(hash: B256, number: u64) -> Self {
        Self { hash, number }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.number)
    }
}

/// Anchor point below which no derivation occurs.
///
/// Computed once from the node configuration and never changed afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// L1 block after (not including) which L2 blocks are derived
    pub l1: BlockId,
    /// L2 genesis block
    pub l2: BlockId,
}

/// Announcement of a new L1 head together with its parent.
///
/// The parent is what lets consumers tell a chain extension from a reorg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadSignal {
    /// The new head
    pub head: BlockId,
    /// Parent of the new head
    pub parent: BlockId,
}

/// The subset of a JSON-RPC block header the node cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub hash: B256,
    pub parent_hash: B256,
    #[serde(with = "quantity")]
    pub number: u64,
}

impl BlockHeader {
    /// Reference to this block
    pub const fn id(&self) -> BlockId {
        BlockId::new(self.hash, self.number)
    }

    /// Reference to the parent block
    pub const fn parent_id(&self) -> BlockId {
        BlockId::new(self.parent_hash, self.number.saturating_sub(1))
    }

    /// Head signal announcing this block
    pub const fn head_signal(&self) -> HeadSignal {
        HeadSignal {
            head: self.id(),
            parent: self.parent_id(),
        }
    }
}

/// Hex quantity encoding (`"0x1b4"`) used by JSON-RPC for block numbers.
mod quantity {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        U64::from(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        U64::deserialize(deserializer).map(|value| value.to::<u64>())
    }
}
