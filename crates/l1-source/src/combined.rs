//! Combined L1 source with failover across redundant endpoints

use crate::{HeadStream, L1Source, L1SourceError};
use alloy_primitives::B256;
use async_trait::async_trait;
use futures::future::BoxFuture;
use rollup_rpc::eth::RawReceipt;
use rollup_rpc::BlockTag;
use rollup_types::BlockHeader;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Unified read interface over N independent L1 sources.
///
/// Every call starts at the last source that answered and falls through the
/// remaining ones in order. The last error is returned when all of them fail.
pub struct CombinedL1Source {
    sources: Vec<Arc<dyn L1Source>>,
    preferred: AtomicUsize,
}

impl CombinedL1Source {
    pub fn new(sources: Vec<Arc<dyn L1Source>>) -> Self {
        Self {
            sources,
            preferred: AtomicUsize::new(0),
        }
    }

    /// Number of underlying sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Index of the source tried first
    pub fn preferred(&self) -> usize {
        self.preferred.load(Ordering::Relaxed)
    }

    async fn with_failover<'a, T, F>(&'a self, op: &str, f: F) -> Result<T, L1SourceError>
    where
        F: Fn(&'a dyn L1Source) -> BoxFuture<'a, Result<T, L1SourceError>>,
    {
        let count = self.sources.len();
        let start = self.preferred();
        let mut last_err = L1SourceError::NoSources;

        for offset in 0..count {
            let index = (start + offset) % count;
            match f(self.sources[index].as_ref()).await {
                Ok(value) => {
                    if index != start {
                        tracing::info!("L1 source {} took over {} from source {}", index, op, start);
                        self.preferred.store(index, Ordering::Relaxed);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    tracing::debug!("L1 source {} failed {}: {}", index, op, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[async_trait]
impl L1Source for CombinedL1Source {
    async fn header_by_number(&self, tag: BlockTag) -> Result<BlockHeader, L1SourceError> {
        self.with_failover("header_by_number", |source| source.header_by_number(tag))
            .await
    }

    async fn header_by_hash(&self, hash: B256) -> Result<BlockHeader, L1SourceError> {
        self.with_failover("header_by_hash", |source| source.header_by_hash(hash))
            .await
    }

    async fn block_receipts(&self, hash: B256) -> Result<Vec<RawReceipt>, L1SourceError> {
        self.with_failover("block_receipts", |source| source.block_receipts(hash))
            .await
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, L1SourceError> {
        self.with_failover("subscribe_new_heads", |source| source.subscribe_new_heads())
            .await
    }

    async fn close(&self) -> Result<(), L1SourceError> {
        let mut first_err = None;
        for (index, source) in self.sources.iter().enumerate() {
            if let Err(e) = source.close().await {
                tracing::warn!("Failed to close L1 source {}: {}", index, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_chain, MockL1Source};

    fn combined(sources: &[Arc<MockL1Source>]) -> CombinedL1Source {
        CombinedL1Source::new(
            sources
                .iter()
                .map(|s| s.clone() as Arc<dyn L1Source>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_fails_over_to_next_source() {
        let chain = mock_chain(0, 0, 3);
        let down = Arc::new(MockL1Source::with_chain(&chain));
        down.set_fail_reads(true);
        let up = Arc::new(MockL1Source::with_chain(&chain));
        let source = combined(&[down.clone(), up.clone()]);

        let header = source.header_by_number(BlockTag::Number(2)).await.unwrap();
        assert_eq!(header, chain[2]);
        assert_eq!(source.preferred(), 1);

        // The healthy source is now tried first
        source.header_by_number(BlockTag::Latest).await.unwrap();
        assert_eq!(down.read_calls(), 1);
        assert_eq!(up.read_calls(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_failing_returns_last_error() {
        let a = Arc::new(MockL1Source::new());
        let b = Arc::new(MockL1Source::new());
        a.set_fail_reads(true);
        b.set_fail_reads(true);
        let source = combined(&[a, b]);

        let err = source.header_by_number(BlockTag::Latest).await.unwrap_err();
        assert!(matches!(err, L1SourceError::Stream(_)));
    }

    #[tokio::test]
    async fn test_empty_source_reports_no_sources() {
        let source = CombinedL1Source::new(Vec::new());
        assert!(source.is_empty());
        let err = source.header_by_hash(B256::ZERO).await.unwrap_err();
        assert!(matches!(err, L1SourceError::NoSources));
    }

    #[tokio::test]
    async fn test_close_closes_every_source() {
        let a = Arc::new(MockL1Source::new());
        let b = Arc::new(MockL1Source::new());
        let source = combined(&[a.clone(), b.clone()]);

        source.close().await.unwrap();
        assert_eq!(a.close_calls(), 1);
        assert_eq!(b.close_calls(), 1);
    }
}
