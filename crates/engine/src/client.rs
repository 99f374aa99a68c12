//! Execution engine client

use crate::EngineError;
use async_trait::async_trait;
use rollup_rpc::{eth, BlockTag, RpcClient};
use rollup_types::BlockHeader;

/// The calls the node makes against an execution engine
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// The engine's current head block
    async fn head(&self) -> Result<BlockHeader, EngineError>;

    /// Release the connection
    async fn close(&self) -> Result<(), EngineError>;
}

/// Engine reached over JSON-RPC (`engine` and `eth` namespaces)
#[derive(Debug)]
pub struct RpcEngineClient {
    client: RpcClient,
}

impl RpcEngineClient {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Get the endpoint address
    pub fn addr(&self) -> &str {
        self.client.addr()
    }
}

#[async_trait]
impl EngineApi for RpcEngineClient {
    async fn head(&self) -> Result<BlockHeader, EngineError> {
        eth::header_by_tag(&self.client, BlockTag::Latest)
            .await?
            .ok_or(EngineError::HeadNotFound)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.client.close().await;
        Ok(())
    }
}
