//! Head Fanout - copies every L1 head signal to all registered consumers
//!
//! Outputs are registered during startup, before the fanout is shared with
//! the head subscription, so no consumer misses a signal by registering late.

use rollup_types::HeadSignal;
use tokio::sync::mpsc;

/// Broadcast point for head signals
#[derive(Debug)]
pub struct HeadFanout {
    outputs: Vec<mpsc::Sender<HeadSignal>>,
    buffer: usize,
}

impl HeadFanout {
    /// Create a fanout whose outputs buffer `buffer` signals each
    pub fn new(buffer: usize) -> Self {
        Self {
            outputs: Vec::new(),
            buffer: buffer.max(1),
        }
    }

    /// Register a new consumer
    pub fn register(&mut self) -> mpsc::Receiver<HeadSignal> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.outputs.push(tx);
        rx
    }

    /// Number of registered outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Deliver `signal` to every output in registration order.
    ///
    /// Waits while an output's buffer is full. Outputs whose consumer is gone
    /// are skipped. Returns the number of outputs that got the signal.
    pub async fn send(&self, signal: HeadSignal) -> usize {
        let mut delivered = 0;
        for tx in &self.outputs {
            if tx.send(signal).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l1_source::test_utils::mock_chain;

    #[tokio::test]
    async fn test_every_consumer_gets_every_signal_in_order() {
        let mut fanout = HeadFanout::new(10);
        let mut outputs: Vec<_> = (0..3).map(|_| fanout.register()).collect();
        let signals: Vec<_> = mock_chain(0, 1, 8).iter().map(|h| h.head_signal()).collect();

        for signal in &signals {
            assert_eq!(fanout.send(*signal).await, 3);
        }
        drop(fanout);

        for rx in &mut outputs {
            let mut received = Vec::new();
            while let Some(signal) = rx.recv().await {
                received.push(signal);
            }
            assert_eq!(received, signals);
        }
    }

    #[tokio::test]
    async fn test_closed_output_is_skipped() {
        let mut fanout = HeadFanout::new(10);
        let gone = fanout.register();
        let mut live = fanout.register();
        drop(gone);

        let signal = mock_chain(0, 1, 2)[0].head_signal();
        assert_eq!(fanout.send(signal).await, 1);
        assert_eq!(live.recv().await, Some(signal));
    }

    #[tokio::test]
    async fn test_full_output_applies_backpressure() {
        let mut fanout = HeadFanout::new(1);
        let mut rx = fanout.register();
        let chain = mock_chain(0, 1, 3);

        fanout.send(chain[0].head_signal()).await;
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            fanout.send(chain[1].head_signal()),
        )
        .await;
        assert!(pending.is_err());

        assert_eq!(rx.recv().await, Some(chain[0].head_signal()));
        assert_eq!(fanout.send(chain[1].head_signal()).await, 1);
    }
}
