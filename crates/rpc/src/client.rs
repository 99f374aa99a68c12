//! JSON-RPC client with lazy WebSocket reconnection

use crate::{eth, RpcError};
use jsonrpsee::core::client::{ClientT, Subscription as RpcSubscription, SubscriptionClientT};
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Transport selected from the endpoint address scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Ws,
}

impl TransportKind {
    /// Pick the transport for `addr` from its scheme
    pub fn from_addr(addr: &str) -> Result<Self, RpcError> {
        match addr.split_once("://") {
            Some(("http" | "https", rest)) if !rest.is_empty() => Ok(Self::Http),
            Some(("ws" | "wss", rest)) if !rest.is_empty() => Ok(Self::Ws),
            _ => Err(RpcError::UnsupportedAddress(addr.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Ws => f.write_str("ws"),
        }
    }
}

enum Transport {
    Http(HttpClient),
    Ws(WsClient),
}

impl Transport {
    fn is_connected(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Ws(client) => client.is_connected(),
        }
    }
}

/// JSON-RPC client for a single endpoint
pub struct RpcClient {
    addr: String,
    kind: TransportKind,
    timeout: Duration,
    transport: Mutex<Option<Arc<Transport>>>,
    closed: AtomicBool,
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("addr", &self.addr)
            .field("kind", &self.kind)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl RpcClient {
    /// Create a client without connecting
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            addr: addr.to_string(),
            kind: TransportKind::from_addr(addr)?,
            timeout,
            transport: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Endpoint address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Transport kind
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Whether a live transport is currently held
    pub async fn is_connected(&self) -> bool {
        self.transport
            .lock()
            .await
            .as_ref()
            .is_some_and(|transport| transport.is_connected())
    }

    /// Establish the transport now instead of on the first request
    pub async fn connect(&self) -> Result<(), RpcError> {
        self.transport().await.map(|_| ())
    }

    async fn transport(&self) -> Result<Arc<Transport>, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        let mut guard = self.transport.lock().await;
        if let Some(transport) = guard.as_ref() {
            if transport.is_connected() {
                return Ok(transport.clone());
            }
            tracing::debug!("Reconnecting to {}", self.addr);
        }

        let transport = Arc::new(match self.kind {
            TransportKind::Http => Transport::Http(
                HttpClientBuilder::default()
                    .request_timeout(self.timeout)
                    .build(&self.addr)?,
            ),
            TransportKind::Ws => Transport::Ws(
                WsClientBuilder::default()
                    .connection_timeout(self.timeout)
                    .request_timeout(self.timeout)
                    .build(&self.addr)
                    .await?,
            ),
        });
        *guard = Some(transport.clone());
        Ok(transport)
    }

    /// Send a request and decode the response
    pub async fn request<R, P>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        R: DeserializeOwned,
        P: ToRpcParams + Send,
    {
        let transport = self.transport().await?;
        let response = match transport.as_ref() {
            Transport::Http(client) => client.request(method, params).await?,
            Transport::Ws(client) => client.request(method, params).await?,
        };
        Ok(response)
    }

    /// Open a server-side subscription. Only WebSocket transports support this.
    pub async fn subscribe<N, P>(
        &self,
        subscribe_method: &str,
        params: P,
        unsubscribe_method: &str,
    ) -> Result<RpcSubscription<N>, RpcError>
    where
        N: DeserializeOwned,
        P: ToRpcParams + Send,
    {
        let transport = self.transport().await?;
        match transport.as_ref() {
            Transport::Http(_) => Err(RpcError::SubscriptionsUnsupported(self.kind)),
            Transport::Ws(client) => Ok(client
                .subscribe(subscribe_method, params, unsubscribe_method)
                .await?),
        }
    }

    /// Drop the transport. Every later call fails with [`RpcError::Closed`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.transport.lock().await.take();
    }
}

/// Outcome of dialing an endpoint
#[derive(Debug)]
pub enum Dialed<T> {
    /// Connected and answering requests
    Connected(T),
    /// Handle is usable but the endpoint is not reachable yet
    Disconnected(T, RpcError),
    /// No handle could be produced
    Failed(RpcError),
}

impl<T> Dialed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dialed<U> {
        match self {
            Self::Connected(t) => Dialed::Connected(f(t)),
            Self::Disconnected(t, err) => Dialed::Disconnected(f(t), err),
            Self::Failed(err) => Dialed::Failed(err),
        }
    }
}

/// Dial `addr`.
///
/// HTTP clients can always be built for a well-formed address and are probed
/// with `eth_chainId`; a failed probe yields [`Dialed::Disconnected`].
/// WebSocket clients need a handshake, so an unreachable endpoint yields
/// [`Dialed::Failed`].
pub async fn dial(addr: &str, timeout: Duration) -> Dialed<RpcClient> {
    let client = match RpcClient::new(addr, timeout) {
        Ok(client) => client,
        Err(err) => return Dialed::Failed(err),
    };

    if let Err(err) = client.connect().await {
        return Dialed::Failed(err);
    }

    if client.kind() == TransportKind::Ws {
        return Dialed::Connected(client);
    }

    match tokio::time::timeout(timeout, eth::chain_id(&client)).await {
        Ok(Ok(chain_id)) => {
            tracing::debug!("Dialed {} (chain id {})", addr, chain_id);
            Dialed::Connected(client)
        }
        Ok(Err(err)) => Dialed::Disconnected(client, err),
        Err(_) => Dialed::Disconnected(client, RpcError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::rpc_params;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_transport_from_scheme() {
        assert_eq!(TransportKind::from_addr("http://localhost:8545").unwrap(), TransportKind::Http);
        assert_eq!(TransportKind::from_addr("https://rpc.example").unwrap(), TransportKind::Http);
        assert_eq!(TransportKind::from_addr("ws://localhost:8546").unwrap(), TransportKind::Ws);
        assert_eq!(TransportKind::from_addr("wss://rpc.example").unwrap(), TransportKind::Ws);
        assert!(TransportKind::from_addr("/tmp/geth.ipc").is_err());
        assert!(TransportKind::from_addr("http://").is_err());
    }

    #[tokio::test]
    async fn test_dial_unsupported_scheme_fails() {
        assert!(matches!(
            dial("ipc:///tmp/geth.ipc", TIMEOUT).await,
            Dialed::Failed(RpcError::UnsupportedAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_dial_unreachable_http_is_disconnected() {
        match dial("http://127.0.0.1:1", TIMEOUT).await {
            Dialed::Disconnected(client, _) => assert_eq!(client.kind(), TransportKind::Http),
            other => panic!("expected disconnected handle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dial_unreachable_ws_fails() {
        assert!(matches!(dial("ws://127.0.0.1:1", TIMEOUT).await, Dialed::Failed(_)));
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let client = RpcClient::new("http://127.0.0.1:1", TIMEOUT).unwrap();
        client.close().await;

        let res = client.request::<String, _>("eth_chainId", rpc_params![]).await;
        assert!(matches!(res, Err(RpcError::Closed)));
        assert!(!client.is_connected().await);
    }
}
