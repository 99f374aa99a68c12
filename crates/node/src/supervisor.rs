//! Head Subscription Supervisor
//!
//! Keeps exactly one L1 head subscription alive and feeds it into the
//! [`HeadFanout`]. A failed subscription is replaced after a fixed interval,
//! for as long as the supervisor runs. Unsubscribing the supervisor ends it
//! together with the current head subscription.

use crate::HeadFanout;
use l1_source::{watch_head_changes, L1Source};
use rollup_types::{Subscription, SubscriptionError};
use std::sync::Arc;
use std::time::Duration;

/// Resubscribing owner of the upstream head subscription
pub struct HeadSubscriptionSupervisor {
    source: Arc<dyn L1Source>,
    fanout: Arc<HeadFanout>,
    interval: Duration,
}

impl HeadSubscriptionSupervisor {
    pub fn new(source: Arc<dyn L1Source>, fanout: Arc<HeadFanout>, interval: Duration) -> Self {
        Self {
            source,
            fanout,
            interval,
        }
    }

    /// Start supervising
    pub fn spawn(self) -> Subscription {
        Subscription::spawn(move |_| self.run())
    }

    async fn run(self) -> Result<(), SubscriptionError> {
        loop {
            let fanout = self.fanout.clone();
            let on_head = move |signal| {
                let fanout = fanout.clone();
                async move {
                    fanout.send(signal).await;
                }
            };

            match watch_head_changes(self.source.as_ref(), on_head).await {
                Ok(mut sub) => {
                    tracing::debug!("Subscribed to L1 heads");
                    let err = match sub.take_err() {
                        Some(err_rx) => err_rx.await.unwrap_or(SubscriptionError::Ended),
                        None => SubscriptionError::Ended,
                    };
                    tracing::warn!(
                        "L1 heads subscription failed, resubscribing in {:?}: {}",
                        self.interval,
                        err
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to subscribe to L1 heads, retrying in {:?}: {}",
                        self.interval,
                        e
                    );
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
