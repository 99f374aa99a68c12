//! Canonical chain view over an L1 source

use crate::{L1Source, L1SourceError};
use rollup_rpc::BlockTag;
use rollup_types::BlockId;
use std::sync::Arc;

/// Canonical L1 block lookup by number
#[derive(Clone)]
pub struct CanonicalChain {
    source: Arc<dyn L1Source>,
}

impl CanonicalChain {
    pub fn new(source: Arc<dyn L1Source>) -> Self {
        Self { source }
    }

    /// The canonical block at `number`
    pub async fn block_id(&self, number: u64) -> Result<BlockId, L1SourceError> {
        let header = self.source.header_by_number(BlockTag::Number(number)).await?;
        Ok(header.id())
    }

    /// The current canonical head
    pub async fn head(&self) -> Result<BlockId, L1SourceError> {
        let header = self.source.header_by_number(BlockTag::Latest).await?;
        Ok(header.id())
    }

    /// Whether `id` is still part of the canonical chain
    pub async fn is_canonical(&self, id: BlockId) -> Result<bool, L1SourceError> {
        match self.block_id(id.number).await {
            Ok(canonical) => Ok(canonical == id),
            Err(L1SourceError::BlockNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{block_hash, mock_chain, MockL1Source};

    #[tokio::test]
    async fn test_canonical_lookup() {
        let chain = mock_chain(0, 0, 5);
        let canonical = CanonicalChain::new(Arc::new(MockL1Source::with_chain(&chain)));

        assert_eq!(canonical.block_id(3).await.unwrap(), chain[3].id());
        assert_eq!(canonical.head().await.unwrap(), chain[4].id());
        assert!(canonical.is_canonical(chain[1].id()).await.unwrap());
        assert!(!canonical
            .is_canonical(BlockId::new(block_hash(9, 1), 1))
            .await
            .unwrap());
        assert!(!canonical
            .is_canonical(BlockId::new(block_hash(0, 7), 7))
            .await
            .unwrap());
    }
}
