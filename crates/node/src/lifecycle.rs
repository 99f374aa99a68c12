//! Lifecycle Coordinator - the node's event loop and ordered teardown
//!
//! The coordinator owns every subscription created during startup. It logs
//! observed L1 heads until a stop request arrives, then releases everything
//! in a fixed order and replies with the collected teardown errors.

use crate::{ShutdownError, TeardownError};
use l1_source::{Downloader, L1Source};
use rollup_engine::Driver;
use rollup_types::{HeadSignal, Subscription};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type StopRequest = oneshot::Sender<Result<(), ShutdownError>>;

/// Owner of the running node's resources
pub struct LifecycleCoordinator {
    l1_source: Arc<dyn L1Source>,
    downloader: Arc<Downloader>,
    drivers: Vec<Arc<dyn Driver>>,
    subscriptions: Vec<Subscription>,
    listeners: Vec<JoinHandle<()>>,
    observer: mpsc::Receiver<HeadSignal>,
}

impl LifecycleCoordinator {
    pub fn new(
        l1_source: Arc<dyn L1Source>,
        downloader: Arc<Downloader>,
        drivers: Vec<Arc<dyn Driver>>,
        observer: mpsc::Receiver<HeadSignal>,
    ) -> Self {
        Self {
            l1_source,
            downloader,
            drivers,
            subscriptions: Vec::new(),
            listeners: Vec::new(),
            observer,
        }
    }

    /// Take ownership of `sub`. Its failure is logged with `msg`.
    pub fn track(&mut self, mut sub: Subscription, msg: &'static str) {
        if let Some(err_rx) = sub.take_err() {
            self.listeners.push(tokio::spawn(async move {
                if let Ok(err) = err_rx.await {
                    tracing::error!("{}: {}", msg, err);
                }
            }));
        }
        self.subscriptions.push(sub);
    }

    /// Run the event loop on its own task
    pub fn spawn(self) -> CoordinatorHandle {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(stop_rx));
        CoordinatorHandle { stop_tx, task }
    }

    async fn run(mut self, mut stop_rx: mpsc::Receiver<StopRequest>) {
        loop {
            tokio::select! {
                Some(signal) = self.observer.recv() => {
                    tracing::info!("New L1 head {} (parent {})", signal.head, signal.parent);
                }
                request = stop_rx.recv() => {
                    let result = self.teardown().await;
                    match request {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                tracing::warn!("Teardown after the node handle was dropped: {}", e);
                            }
                        }
                    }
                    return;
                }
            }
        }
    }

    async fn teardown(&mut self) -> Result<(), ShutdownError> {
        tracing::info!("Closing rollup node");
        let mut errors = Vec::new();

        // Newest first: the head subscription stops before the drivers it feeds
        while let Some(sub) = self.subscriptions.pop() {
            sub.unsubscribe().await;
        }
        for listener in std::mem::take(&mut self.listeners) {
            if let Err(e) = listener.await {
                tracing::warn!("Subscription error listener failed: {}", e);
                errors.push(TeardownError::Listener(e));
            }
        }

        self.downloader.close().await;

        if let Err(e) = self.l1_source.close().await {
            tracing::warn!("Failed to close L1 source: {}", e);
            errors.push(TeardownError::L1Source(e));
        }

        for (index, driver) in self.drivers.iter().enumerate() {
            if let Err(e) = driver.close().await {
                tracing::warn!("Failed to close engine {}: {}", index, e);
                errors.push(TeardownError::Engine { index, source: e });
            }
        }

        tracing::info!("Rollup node closed");
        ShutdownError::from_errors(errors)
    }
}

/// Control handle of a running coordinator.
///
/// Dropping it makes the coordinator tear down on its own.
#[derive(Debug)]
pub struct CoordinatorHandle {
    stop_tx: mpsc::Sender<StopRequest>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Request teardown and wait until it completed
    pub async fn stop(self) -> Result<(), ShutdownError> {
        let (reply, done) = oneshot::channel();
        if self.stop_tx.send(reply).await.is_err() {
            return ShutdownError::from_errors(vec![TeardownError::Coordinator]);
        }
        let result = done
            .await
            .unwrap_or_else(|_| ShutdownError::from_errors(vec![TeardownError::Coordinator]));

        if let Err(e) = self.task.await {
            tracing::warn!("Lifecycle coordinator did not exit cleanly: {}", e);
        }
        result
    }
}
