//! Rollup Node - start and stop of the whole runtime

use crate::{
    bootstrap_engine, CoordinatorHandle, Dialer, EndpointSet, HeadFanout,
    HeadSubscriptionSupervisor, LifecycleCoordinator, NodeConfig, NodeError, RuntimeConfig,
    ShutdownError,
};
use futures::future::join_all;
use l1_source::{CanonicalChain, CombinedL1Source, Downloader, L1Source};
use rollup_engine::{Driver, EngineDriver, SyncSource};
use std::sync::Arc;

enum Lifecycle {
    Idle,
    Running(CoordinatorHandle),
    Stopped,
}

/// A rollup node: one combined L1 source feeding any number of engine drivers
pub struct RollupNode {
    runtime: RuntimeConfig,
    l1_source: Arc<dyn L1Source>,
    downloader: Arc<Downloader>,
    drivers: Vec<Arc<dyn Driver>>,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl RollupNode {
    /// Validate `config` and dial every configured endpoint
    pub async fn new(config: &NodeConfig, dialer: &dyn Dialer) -> Result<Self, NodeError> {
        config.check()?;

        let endpoints =
            EndpointSet::resolve(dialer, &config.l1_node_addrs, &config.l2_engine_addrs).await?;
        let l1_source: Arc<dyn L1Source> = Arc::new(CombinedL1Source::new(endpoints.l1));
        let canonical = CanonicalChain::new(l1_source.clone());
        let downloader = Arc::new(Downloader::new(l1_source.clone()));
        let genesis = config.genesis();

        let drivers = endpoints
            .engines
            .into_iter()
            .map(|engine| {
                let sync = SyncSource::new(canonical.clone(), engine.client.clone());
                Arc::new(EngineDriver::new(
                    engine.index,
                    engine.client,
                    downloader.clone(),
                    sync,
                    genesis,
                )) as Arc<dyn Driver>
            })
            .collect();

        Ok(Self::from_parts(
            config.runtime.clone(),
            l1_source,
            downloader,
            drivers,
        ))
    }

    /// Assemble a node from already constructed parts
    pub fn from_parts(
        runtime: RuntimeConfig,
        l1_source: Arc<dyn L1Source>,
        downloader: Arc<Downloader>,
        drivers: Vec<Arc<dyn Driver>>,
    ) -> Self {
        Self {
            runtime,
            l1_source,
            downloader,
            drivers,
            lifecycle: tokio::sync::Mutex::new(Lifecycle::Idle),
        }
    }

    /// Attached engine drivers
    pub fn drivers(&self) -> &[Arc<dyn Driver>] {
        &self.drivers
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running(_))
    }

    /// Bootstrap the engines and start following L1.
    ///
    /// A no-op when already running. Fails with [`NodeError::Stopped`] once
    /// the node was stopped.
    pub async fn start(&self) -> Result<(), NodeError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Running(_) => {
                tracing::debug!("Rollup node already running");
                return Ok(());
            }
            Lifecycle::Stopped => return Err(NodeError::Stopped),
            Lifecycle::Idle => {}
        }

        tracing::info!("Starting rollup node");
        self.downloader.add_receipt_workers(self.runtime.receipt_workers);

        tracing::info!("Attaching {} execution engine(s)", self.drivers.len());
        let timeout = self.runtime.bootstrap_timeout;
        join_all(
            self.drivers
                .iter()
                .enumerate()
                .map(|(index, driver)| bootstrap_engine(driver.as_ref(), index, timeout)),
        )
        .await;

        // Every output exists before the head subscription is opened
        let mut fanout = HeadFanout::new(self.runtime.head_buffer);
        let feeds: Vec<_> = self.drivers.iter().map(|_| fanout.register()).collect();
        let observer = fanout.register();

        let mut coordinator = LifecycleCoordinator::new(
            self.l1_source.clone(),
            self.downloader.clone(),
            self.drivers.clone(),
            observer,
        );
        for (driver, heads) in self.drivers.iter().zip(feeds) {
            coordinator.track(driver.clone().drive(heads), "Engine driver unexpectedly failed");
        }

        let supervisor = HeadSubscriptionSupervisor::new(
            self.l1_source.clone(),
            Arc::new(fanout),
            self.runtime.resubscribe_interval,
        );
        coordinator.track(supervisor.spawn(), "L1 heads subscription failed");

        *lifecycle = Lifecycle::Running(coordinator.spawn());
        tracing::info!("Start-up complete");
        Ok(())
    }

    /// Tear the node down and wait for it to finish.
    ///
    /// Every teardown step runs even when an earlier one failed; all failures
    /// are returned together. Stopping a node that is not running is a no-op.
    pub async fn stop(&self) -> Result<(), ShutdownError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(handle) => handle.stop().await,
            Lifecycle::Idle => {
                *lifecycle = Lifecycle::Idle;
                Ok(())
            }
            Lifecycle::Stopped => Ok(()),
        }
    }
}
