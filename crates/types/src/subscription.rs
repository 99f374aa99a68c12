//! Cancelable feed handle
//!
//! A [`Subscription`] owns a spawned producer task. The producer reports at
//! most one error through the error channel; unsubscribing cancels it and
//! closes the channel without an error.

use std::future::Future;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Asynchronous termination reason of a subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The producer failed
    #[error("{0}")]
    Failed(String),

    /// The underlying stream ended without an error
    #[error("subscription stream ended")]
    Ended,
}

impl SubscriptionError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Handle to an active feed.
///
/// Consumed by [`Subscription::unsubscribe`], so a handle can be released
/// only once. Dropping the handle cancels the producer as well.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    err: Option<oneshot::Receiver<SubscriptionError>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn `producer` on the runtime and return its handle.
    ///
    /// The producer receives the subscription's cancellation token. It is
    /// dropped at its next suspension point once the token fires.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), SubscriptionError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (err_tx, err_rx) = oneshot::channel();
        let fut = producer(cancel.clone());
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Ok(()),
                res = fut => res,
            };

            if let Err(err) = result {
                if !token.is_cancelled() {
                    let _ = err_tx.send(err);
                }
            }
        });

        Self {
            cancel,
            err: Some(err_rx),
            task: Some(task),
        }
    }

    /// Take the error channel.
    ///
    /// Resolves with the producer's error, or with a `RecvError` once the
    /// subscription ended without one. Returns `None` after the first call.
    pub fn take_err(&mut self) -> Option<oneshot::Receiver<SubscriptionError>> {
        self.err.take()
    }

    /// Whether the producer task has finished.
    pub fn is_terminated(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the producer and wait for its task to exit.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Subscription task did not exit cleanly: {}", e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_error_is_delivered() {
        let mut sub = Subscription::spawn(|_| async { Err(SubscriptionError::failed("boom")) });
        let err = sub.take_err().unwrap().await.unwrap();
        assert_eq!(err, SubscriptionError::Failed("boom".to_string()));
        assert!(sub.take_err().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_error_channel() {
        let mut sub = Subscription::spawn(|_| std::future::pending());
        let err_rx = sub.take_err().unwrap();

        sub.unsubscribe().await;
        assert!(err_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_waits_for_producer_exit() {
        struct SetOnDrop(Arc<AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let guard = SetOnDrop(dropped.clone());
        let sub = Subscription::spawn(move |_| async move {
            let _guard = guard;
            std::future::pending::<()>().await;
            Ok(())
        });

        sub.unsubscribe().await;
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_cancels_producer() {
        let (tx, rx) = oneshot::channel::<()>();
        let sub = Subscription::spawn(move |cancel| async move {
            cancel.cancelled().await;
            let _ = tx.send(());
            Ok(())
        });
        assert!(!sub.is_terminated());
        drop(sub);

        // The biased select drops the producer before it observes the token,
        // so the sender is dropped rather than used.
        let res = tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap();
        assert!(res.is_err());
    }
}
