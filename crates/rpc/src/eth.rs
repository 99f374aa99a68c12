//! `eth` namespace calls

use crate::{RpcClient, RpcError};
use alloy_primitives::{B256, U64};
use jsonrpsee::core::client::Subscription as RpcSubscription;
use jsonrpsee::rpc_params;
use rollup_types::BlockHeader;
use serde::{Serialize, Serializer};
use std::fmt;

/// Block selector for `eth_getBlockByNumber`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Number(number) => serializer.serialize_str(&format!("{:#x}", number)),
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Number(number) => write!(f, "#{}", number),
        }
    }
}

/// Raw receipt as returned by `eth_getBlockReceipts`
pub type RawReceipt = serde_json::Value;

pub async fn chain_id(client: &RpcClient) -> Result<u64, RpcError> {
    let id: U64 = client.request("eth_chainId", rpc_params![]).await?;
    Ok(id.to::<u64>())
}

pub async fn header_by_tag(
    client: &RpcClient,
    tag: BlockTag,
) -> Result<Option<BlockHeader>, RpcError> {
    client
        .request("eth_getBlockByNumber", rpc_params![tag, false])
        .await
}

pub async fn header_by_hash(
    client: &RpcClient,
    hash: B256,
) -> Result<Option<BlockHeader>, RpcError> {
    client
        .request("eth_getBlockByHash", rpc_params![hash, false])
        .await
}

pub async fn block_receipts(
    client: &RpcClient,
    hash: B256,
) -> Result<Option<Vec<RawReceipt>>, RpcError> {
    client
        .request("eth_getBlockReceipts", rpc_params![hash])
        .await
}

/// `eth_subscribe("newHeads")`
pub async fn subscribe_new_heads(
    client: &RpcClient,
) -> Result<RpcSubscription<BlockHeader>, RpcError> {
    client
        .subscribe("eth_subscribe", rpc_params!["newHeads"], "eth_unsubscribe")
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_serialization() {
        assert_eq!(serde_json::to_string(&BlockTag::Latest).unwrap(), "\"latest\"");
        assert_eq!(serde_json::to_string(&BlockTag::Number(436)).unwrap(), "\"0x1b4\"");
        assert_eq!(serde_json::to_string(&BlockTag::Number(0)).unwrap(), "\"0x0\"");
    }
}
