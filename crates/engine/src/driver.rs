//! Engine driver - keeps one execution engine following the L1 head

use crate::{DriverError, EngineApi, EngineDriverState, EngineHeads, SyncError, SyncSource};
use async_trait::async_trait;
use l1_source::Downloader;
use parking_lot::Mutex;
use rollup_types::{BlockId, Genesis, HeadSignal, Subscription, SubscriptionError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Contract between the node runtime and a per-engine driver
#[async_trait]
pub trait Driver: Send + Sync {
    /// Genesis the driver was created with
    fn genesis(&self) -> Genesis;

    /// Query the engine for its heads and adopt them.
    ///
    /// The state is only replaced once every query succeeded, so dropping
    /// the future early leaves it untouched.
    async fn request_update(&self) -> Result<(), DriverError>;

    /// Force the driver's heads
    fn update_head(&self, l1: BlockId, l2: BlockId);

    /// Consume `heads` until the returned subscription is cancelled, the
    /// stream closes, or the driver fails irrecoverably.
    fn drive(self: Arc<Self>, heads: mpsc::Receiver<HeadSignal>) -> Subscription;

    /// Release the engine connection
    async fn close(&self) -> Result<(), DriverError>;
}

/// Driver for one execution engine
pub struct EngineDriver {
    index: usize,
    engine: Arc<dyn EngineApi>,
    downloader: Arc<Downloader>,
    sync: SyncSource,
    state: Mutex<EngineDriverState>,
}

impl EngineDriver {
    /// Create a new driver
    pub fn new(
        index: usize,
        engine: Arc<dyn EngineApi>,
        downloader: Arc<Downloader>,
        sync: SyncSource,
        genesis: Genesis,
    ) -> Self {
        Self {
            index,
            engine,
            downloader,
            sync,
            state: Mutex::new(EngineDriverState::new(genesis)),
        }
    }

    /// Snapshot of the driver state
    pub fn state(&self) -> EngineDriverState {
        self.state.lock().clone()
    }

    async fn on_head_signal(&self, signal: HeadSignal) -> Result<(), DriverError> {
        let state = self.state();
        if state.latest_l1() == Some(signal.head) {
            tracing::trace!("Ignoring duplicate L1 head {}", signal.head);
            return Ok(());
        }

        // Receipts are the derivation input of the new L1 block
        match self.downloader.fetch_receipts(signal.head).await {
            Ok(receipts) => {
                tracing::debug!("Fetched {} receipts of L1 block {}", receipts.len(), signal.head)
            }
            Err(e) => tracing::warn!("Failed to fetch receipts of L1 block {}: {}", signal.head, e),
        }

        let extends = state.latest_l1() == Some(signal.parent);
        self.state.lock().observe_l1(signal.head);
        if extends {
            return Ok(());
        }

        let Some(EngineHeads { l1: origin, .. }) = state.heads() else {
            tracing::warn!("Engine heads unknown at L1 head {}, resyncing", signal.head);
            return self.request_update().await;
        };

        let canonical = self
            .sync
            .canonical()
            .is_canonical(origin)
            .await
            .map_err(SyncError::L1)?;
        if canonical {
            tracing::debug!(
                "L1 head {} does not extend the previous head, origin {} is still canonical",
                signal.head,
                origin
            );
            return Ok(());
        }

        tracing::warn!("L1 reorg: origin {} is no longer canonical, resyncing", origin);
        self.request_update().await
    }
}

#[async_trait]
impl Driver for EngineDriver {
    fn genesis(&self) -> Genesis {
        self.state.lock().genesis()
    }

    async fn request_update(&self) -> Result<(), DriverError> {
        let genesis = self.genesis();
        let heads = self.sync.find_sync_start(&genesis).await?;
        self.update_head(heads.l1, heads.l2);
        tracing::info!("Engine {} synced to L2 head {} (L1 origin {})", self.index, heads.l2, heads.l1);
        Ok(())
    }

    fn update_head(&self, l1: BlockId, l2: BlockId) {
        self.state.lock().update_head(l1, l2);
    }

    fn drive(self: Arc<Self>, mut heads: mpsc::Receiver<HeadSignal>) -> Subscription {
        let span = tracing::info_span!("engine", index = self.index);
        Subscription::spawn(move |_| {
            async move {
                while let Some(signal) = heads.recv().await {
                    if let Err(e) = self.on_head_signal(signal).await {
                        if e.is_fatal() {
                            return Err(SubscriptionError::failed(e));
                        }
                        tracing::warn!("Failed to process L1 head {}: {}", signal.head, e);
                    }
                }
                tracing::debug!("L1 head stream closed, driver exiting");
                Ok(())
            }
            .instrument(span)
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.engine.close().await?;
        Ok(())
    }
}
