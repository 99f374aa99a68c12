//! L1 head watching

use crate::{L1Source, L1SourceError};
use futures::StreamExt;
use rollup_types::{HeadSignal, Subscription, SubscriptionError};
use std::future::Future;

/// Open a head stream on `source` and hand every new head to `on_head`.
///
/// The returned subscription fails when the stream reports an error or ends;
/// it never resubscribes by itself.
pub async fn watch_head_changes<F, Fut>(
    source: &dyn L1Source,
    mut on_head: F,
) -> Result<Subscription, L1SourceError>
where
    F: FnMut(HeadSignal) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut heads = source.subscribe_new_heads().await?;

    Ok(Subscription::spawn(move |_| async move {
        while let Some(header) = heads.next().await {
            let header = header.map_err(SubscriptionError::failed)?;
            on_head(header.head_signal()).await;
        }
        Err(SubscriptionError::Ended)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_chain, MockL1Source};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_forwards_heads_as_signals() {
        let chain = mock_chain(0, 0, 3);
        let source = MockL1Source::with_chain(&chain);
        let (tx, mut rx) = mpsc::channel(10);

        let mut sub = watch_head_changes(&source, move |signal| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(signal).await;
            }
        })
        .await
        .unwrap();

        assert!(source.push_head(chain[1]));
        assert!(source.push_head(chain[2]));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.head, chain[1].id());
        assert_eq!(first.parent, chain[0].id());
        assert_eq!(rx.recv().await.unwrap().head, chain[2].id());

        source.fail_head_subscription("connection reset");
        let err = sub.take_err().unwrap().await.unwrap();
        assert!(matches!(err, SubscriptionError::Failed(_)));
    }

    #[tokio::test]
    async fn test_ended_stream_fails_subscription() {
        let source = MockL1Source::new();
        let mut sub = watch_head_changes(&source, |_| async {}).await.unwrap();

        source.end_head_subscription();
        assert_eq!(sub.take_err().unwrap().await.unwrap(), SubscriptionError::Ended);
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_returned() {
        let source = MockL1Source::new();
        source.set_fail_subscribe(true);
        assert!(watch_head_changes(&source, |_| async {}).await.is_err());
    }
}
