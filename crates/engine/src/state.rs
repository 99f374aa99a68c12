//! Per-engine driver state

use rollup_types::{BlockId, Genesis};

/// Heads an engine is synced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineHeads {
    /// L1 block the L2 head was derived from
    pub l1: BlockId,
    /// L2 head of the engine
    pub l2: BlockId,
}

/// State owned by one engine driver.
///
/// The genesis is fixed at construction. The heads stay undefined until the
/// driver is bootstrapped, either from the engine or from the genesis.
#[derive(Debug, Clone)]
pub struct EngineDriverState {
    genesis: Genesis,
    heads: Option<EngineHeads>,
    latest_l1: Option<BlockId>,
}

impl EngineDriverState {
    pub fn new(genesis: Genesis) -> Self {
        Self {
            genesis,
            heads: None,
            latest_l1: None,
        }
    }

    pub fn genesis(&self) -> Genesis {
        self.genesis
    }

    /// `None` until bootstrapped
    pub fn heads(&self) -> Option<EngineHeads> {
        self.heads
    }

    /// Latest L1 head seen on the head stream
    pub fn latest_l1(&self) -> Option<BlockId> {
        self.latest_l1
    }

    /// Replace both heads at once
    pub fn update_head(&mut self, l1: BlockId, l2: BlockId) {
        self.heads = Some(EngineHeads { l1, l2 });
    }

    pub fn observe_l1(&mut self, head: BlockId) {
        self.latest_l1 = Some(head);
    }
}
