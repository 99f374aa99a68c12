//! L1 Source trait and the JSON-RPC implementation

use crate::{L1SourceError, DEFAULT_POLL_INTERVAL};
use alloy_primitives::B256;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use rollup_rpc::eth::{self, RawReceipt};
use rollup_rpc::{BlockTag, RpcClient, TransportKind};
use rollup_types::BlockHeader;
use std::sync::Arc;
use std::time::Duration;

/// Stream of new L1 heads
pub type HeadStream = BoxStream<'static, Result<BlockHeader, L1SourceError>>;

/// Read access to the L1 chain
#[async_trait]
pub trait L1Source: Send + Sync {
    /// Header of the block selected by `tag`
    async fn header_by_number(&self, tag: BlockTag) -> Result<BlockHeader, L1SourceError>;

    /// Header of the block with `hash`
    async fn header_by_hash(&self, hash: B256) -> Result<BlockHeader, L1SourceError>;

    /// All receipts of the block with `hash`
    async fn block_receipts(&self, hash: B256) -> Result<Vec<RawReceipt>, L1SourceError>;

    /// Open a stream of new heads
    async fn subscribe_new_heads(&self) -> Result<HeadStream, L1SourceError>;

    /// Terminate the underlying connections
    async fn close(&self) -> Result<(), L1SourceError>;
}

/// L1 source backed by one JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcL1Client {
    client: Arc<RpcClient>,
    poll_interval: Duration,
}

impl RpcL1Client {
    /// Create a new L1 client
    pub fn new(client: RpcClient) -> Self {
        Self {
            client: Arc::new(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the head polling interval used on HTTP transports
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Get the endpoint address
    pub fn addr(&self) -> &str {
        self.client.addr()
    }
}

#[async_trait]
impl L1Source for RpcL1Client {
    async fn header_by_number(&self, tag: BlockTag) -> Result<BlockHeader, L1SourceError> {
        eth::header_by_tag(&self.client, tag)
            .await?
            .ok_or_else(|| L1SourceError::BlockNotFound(tag.to_string()))
    }

    async fn header_by_hash(&self, hash: B256) -> Result<BlockHeader, L1SourceError> {
        eth::header_by_hash(&self.client, hash)
            .await?
            .ok_or_else(|| L1SourceError::BlockNotFound(hash.to_string()))
    }

    async fn block_receipts(&self, hash: B256) -> Result<Vec<RawReceipt>, L1SourceError> {
        eth::block_receipts(&self.client, hash)
            .await?
            .ok_or_else(|| L1SourceError::BlockNotFound(hash.to_string()))
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, L1SourceError> {
        match self.client.kind() {
            TransportKind::Ws => {
                let sub = eth::subscribe_new_heads(&self.client).await?;
                Ok(sub
                    .map(|item| item.map_err(|e| L1SourceError::Stream(e.to_string())))
                    .boxed())
            }
            TransportKind::Http => {
                tracing::debug!(
                    "Polling L1 heads on {} every {:?}",
                    self.client.addr(),
                    self.poll_interval
                );
                Ok(poll_heads(self.client.clone(), self.poll_interval))
            }
        }
    }

    async fn close(&self) -> Result<(), L1SourceError> {
        self.client.close().await;
        Ok(())
    }
}

/// Poll the latest header, emitting it whenever its hash changes
fn poll_heads(client: Arc<RpcClient>, interval: Duration) -> HeadStream {
    stream::unfold((client, None::<B256>), move |(client, mut last)| async move {
        loop {
            match eth::header_by_tag(&client, BlockTag::Latest).await {
                Ok(Some(header)) if last != Some(header.hash) => {
                    last = Some(header.hash);
                    return Some((Ok(header), (client, last)));
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    let err = L1SourceError::BlockNotFound(BlockTag::Latest.to_string());
                    return Some((Err(err), (client, last)));
                }
                Err(err) => return Some((Err(err.into()), (client, last))),
            }
            tokio::time::sleep(interval).await;
        }
    })
    .boxed()
}
