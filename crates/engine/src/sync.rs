//! Sync start lookup

use crate::{EngineApi, EngineHeads, SyncError};
use l1_source::CanonicalChain;
use rollup_types::Genesis;
use std::sync::Arc;

/// Pairs the canonical L1 chain with an engine to locate the engine's heads.
///
/// Every L2 block after genesis is derived from exactly one L1 block, so the
/// L1 origin of L2 block `n` is the canonical L1 block
/// `genesis.l1.number + (n - genesis.l2.number)`.
#[derive(Clone)]
pub struct SyncSource {
    l1: CanonicalChain,
    l2: Arc<dyn EngineApi>,
}

impl SyncSource {
    pub fn new(l1: CanonicalChain, l2: Arc<dyn EngineApi>) -> Self {
        Self { l1, l2 }
    }

    /// The canonical L1 chain
    pub fn canonical(&self) -> &CanonicalChain {
        &self.l1
    }

    /// Find the engine's heads, relative to `genesis`
    pub async fn find_sync_start(&self, genesis: &Genesis) -> Result<EngineHeads, SyncError> {
        let head = self.l2.head().await?.id();

        if head.number < genesis.l2.number {
            return Err(SyncError::BelowGenesis {
                head,
                genesis: genesis.l2,
            });
        }

        if head.number == genesis.l2.number {
            if head != genesis.l2 {
                return Err(SyncError::GenesisMismatch {
                    expected: genesis.l2,
                    found: head,
                });
            }
            return Ok(EngineHeads {
                l1: genesis.l1,
                l2: genesis.l2,
            });
        }

        let origin = genesis.l1.number + (head.number - genesis.l2.number);
        let l1 = self.l1.block_id(origin).await?;
        Ok(EngineHeads { l1, l2: head })
    }
}
