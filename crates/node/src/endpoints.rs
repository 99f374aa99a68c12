//! Endpoint resolution
//!
//! Turns the configured L1 and engine addresses into live client handles.
//! A handle that is usable but not connected yet is accepted with a warning.
//! An L1 address that produces no handle at all keeps the node from starting,
//! an engine address that does so is skipped.

use crate::{ConfigError, NodeError};
use async_trait::async_trait;
use l1_source::{L1Source, RpcL1Client};
use rollup_engine::{EngineApi, RpcEngineClient};
use rollup_rpc::Dialed;
use std::sync::Arc;
use std::time::Duration;

/// Opens client handles for configured addresses
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial_l1(&self, index: usize, addr: &str) -> Dialed<Arc<dyn L1Source>>;

    async fn dial_engine(&self, index: usize, addr: &str) -> Dialed<Arc<dyn EngineApi>>;
}

/// Dials JSON-RPC endpoints over HTTP or WebSocket
#[derive(Debug, Clone)]
pub struct RpcDialer {
    dial_timeout: Duration,
    poll_interval: Duration,
}

impl RpcDialer {
    pub fn new(dial_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            dial_timeout,
            poll_interval,
        }
    }
}

#[async_trait]
impl Dialer for RpcDialer {
    async fn dial_l1(&self, _index: usize, addr: &str) -> Dialed<Arc<dyn L1Source>> {
        let poll_interval = self.poll_interval;
        rollup_rpc::dial(addr, self.dial_timeout).await.map(|client| {
            Arc::new(RpcL1Client::new(client).with_poll_interval(poll_interval)) as Arc<dyn L1Source>
        })
    }

    async fn dial_engine(&self, _index: usize, addr: &str) -> Dialed<Arc<dyn EngineApi>> {
        rollup_rpc::dial(addr, self.dial_timeout)
            .await
            .map(|client| Arc::new(RpcEngineClient::new(client)) as Arc<dyn EngineApi>)
    }
}

/// One dialed execution engine
#[derive(Clone)]
pub struct EngineEndpoint {
    /// Position in the configured engine list
    pub index: usize,
    pub addr: String,
    pub client: Arc<dyn EngineApi>,
}

/// Resolved endpoint handles
pub struct EndpointSet {
    pub l1: Vec<Arc<dyn L1Source>>,
    pub engines: Vec<EngineEndpoint>,
}

impl EndpointSet {
    /// Dial every address.
    ///
    /// On failure the L1 handles dialed so far are closed before returning.
    pub async fn resolve(
        dialer: &dyn Dialer,
        l1_addrs: &[String],
        engine_addrs: &[String],
    ) -> Result<Self, NodeError> {
        let mut l1 = Vec::with_capacity(l1_addrs.len());
        for (index, addr) in l1_addrs.iter().enumerate() {
            match dialer.dial_l1(index, addr).await {
                Dialed::Connected(source) => {
                    tracing::debug!("Dialed L1 address {} ({})", index, addr);
                    l1.push(source);
                }
                Dialed::Disconnected(source, err) => {
                    tracing::warn!(
                        "Failed to dial L1 address {} ({}), but may connect later: {}",
                        index,
                        addr,
                        err
                    );
                    l1.push(source);
                }
                Dialed::Failed(err) => {
                    close_l1(&l1).await;
                    return Err(NodeError::EndpointUnavailable {
                        index,
                        addr: addr.clone(),
                        source: err,
                    });
                }
            }
        }
        if l1.is_empty() {
            return Err(ConfigError::NoL1Endpoints.into());
        }

        let mut engines = Vec::with_capacity(engine_addrs.len());
        for (index, addr) in engine_addrs.iter().enumerate() {
            let client = match dialer.dial_engine(index, addr).await {
                Dialed::Connected(client) => client,
                Dialed::Disconnected(client, err) => {
                    tracing::warn!(
                        "Failed to dial L2 address {} ({}), but may connect later: {}",
                        index,
                        addr,
                        err
                    );
                    client
                }
                Dialed::Failed(err) => {
                    tracing::warn!("Skipping L2 address {} ({}): {}", index, addr, err);
                    continue;
                }
            };
            engines.push(EngineEndpoint {
                index,
                addr: addr.clone(),
                client,
            });
        }

        tracing::info!(
            "Resolved {} L1 source(s) and {} of {} engine(s)",
            l1.len(),
            engines.len(),
            engine_addrs.len()
        );
        Ok(Self { l1, engines })
    }
}

async fn close_l1(sources: &[Arc<dyn L1Source>]) {
    for source in sources {
        if let Err(e) = source.close().await {
            tracing::warn!("Failed to close L1 source: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use l1_source::test_utils::MockL1Source;
    use parking_lot::Mutex;
    use rollup_engine::test_utils::MockEngine;
    use rollup_rpc::RpcError;
    use std::collections::HashMap;

    /// How a mock address dials
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub enum DialMode {
        Up,
        Down,
        Fail,
    }

    /// Dialer handing out mocks keyed by address
    #[derive(Default)]
    pub struct MockDialer {
        pub l1: Mutex<HashMap<String, (DialMode, Arc<MockL1Source>)>>,
        pub engines: Mutex<HashMap<String, (DialMode, Arc<MockEngine>)>>,
    }

    impl MockDialer {
        pub fn l1(&self, addr: &str, mode: DialMode, source: Arc<MockL1Source>) {
            self.l1.lock().insert(addr.to_string(), (mode, source));
        }

        pub fn engine(&self, addr: &str, mode: DialMode, engine: Arc<MockEngine>) {
            self.engines.lock().insert(addr.to_string(), (mode, engine));
        }
    }

    fn dialed<T>(mode: DialMode, addr: &str, handle: T) -> Dialed<T> {
        let err = || RpcError::UnsupportedAddress(addr.to_string());
        match mode {
            DialMode::Up => Dialed::Connected(handle),
            DialMode::Down => Dialed::Disconnected(handle, err()),
            DialMode::Fail => Dialed::Failed(err()),
        }
    }

    #[async_trait]
    impl Dialer for MockDialer {
        async fn dial_l1(&self, _index: usize, addr: &str) -> Dialed<Arc<dyn L1Source>> {
            match self.l1.lock().get(addr) {
                Some((mode, source)) => dialed(*mode, addr, source.clone() as Arc<dyn L1Source>),
                None => dialed(DialMode::Fail, addr, Arc::new(MockL1Source::new()) as Arc<dyn L1Source>),
            }
        }

        async fn dial_engine(&self, _index: usize, addr: &str) -> Dialed<Arc<dyn EngineApi>> {
            match self.engines.lock().get(addr) {
                Some((mode, engine)) => dialed(*mode, addr, engine.clone() as Arc<dyn EngineApi>),
                None => dialed(DialMode::Fail, addr, Arc::new(MockEngine::default()) as Arc<dyn EngineApi>),
            }
        }
    }

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_disconnected_handles_are_kept() {
        let dialer = MockDialer::default();
        dialer.l1("l1-a", DialMode::Up, Arc::new(MockL1Source::new()));
        dialer.l1("l1-b", DialMode::Down, Arc::new(MockL1Source::new()));
        dialer.engine("l2-a", DialMode::Down, Arc::new(MockEngine::default()));

        let set = EndpointSet::resolve(&dialer, &addrs(&["l1-a", "l1-b"]), &addrs(&["l2-a"]))
            .await
            .unwrap();
        assert_eq!(set.l1.len(), 2);
        assert_eq!(set.engines.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_engine_is_skipped() {
        let dialer = MockDialer::default();
        dialer.l1("l1", DialMode::Up, Arc::new(MockL1Source::new()));
        dialer.engine("l2-b", DialMode::Up, Arc::new(MockEngine::default()));

        let set = EndpointSet::resolve(&dialer, &addrs(&["l1"]), &addrs(&["l2-a", "l2-b"]))
            .await
            .unwrap();
        assert_eq!(set.engines.len(), 1);
        assert_eq!(set.engines[0].index, 1);
        assert_eq!(set.engines[0].addr, "l2-b");
    }

    #[tokio::test]
    async fn test_failed_l1_closes_dialed_sources() {
        let first = Arc::new(MockL1Source::new());
        let dialer = MockDialer::default();
        dialer.l1("l1-a", DialMode::Up, first.clone());

        let err = EndpointSet::resolve(&dialer, &addrs(&["l1-a", "l1-b"]), &[])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NodeError::EndpointUnavailable { index: 1, .. }));
        assert_eq!(first.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_l1_addresses() {
        let dialer = MockDialer::default();
        let err = EndpointSet::resolve(&dialer, &[], &[]).await.err().unwrap();
        assert!(matches!(err, NodeError::Config(ConfigError::NoL1Endpoints)));
    }
}
