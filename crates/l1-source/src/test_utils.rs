//! Test utilities for code consuming an [`L1Source`]

use crate::{HeadStream, L1Source, L1SourceError};
use alloy_primitives::B256;
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use parking_lot::Mutex;
use rollup_rpc::eth::RawReceipt;
use rollup_rpc::BlockTag;
use rollup_types::BlockHeader;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic, never-zero block hash: `fork` in the first byte, `number`
/// in the last eight.
pub fn block_hash(fork: u8, number: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = fork;
    bytes[1] = 0xb1;
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

/// Linked headers `from..to` on `fork`
pub fn mock_chain(fork: u8, from: u64, to: u64) -> Vec<BlockHeader> {
    (from..to)
        .map(|number| BlockHeader {
            hash: block_hash(fork, number),
            parent_hash: if number == 0 {
                B256::ZERO
            } else {
                block_hash(fork, number - 1)
            },
            number,
        })
        .collect()
}

type HeadSender = UnboundedSender<Result<BlockHeader, L1SourceError>>;

/// In-memory L1 source with a controllable head feed
#[derive(Default)]
pub struct MockL1Source {
    headers: Mutex<BTreeMap<u64, BlockHeader>>,
    receipts: Mutex<HashMap<B256, Vec<RawReceipt>>>,
    head_tx: Mutex<Option<HeadSender>>,
    fail_reads: AtomicBool,
    fail_subscribe: AtomicBool,
    receipt_delay: Mutex<Option<Duration>>,
    read_calls: AtomicUsize,
    receipt_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockL1Source {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(chain: &[BlockHeader]) -> Self {
        let source = Self::new();
        for header in chain {
            source.insert_header(*header);
        }
        source
    }

    /// Make `header` the canonical block at its number
    pub fn insert_header(&self, header: BlockHeader) {
        self.headers.lock().insert(header.number, header);
    }

    pub fn insert_receipts(&self, hash: B256, receipts: Vec<RawReceipt>) {
        self.receipts.lock().insert(hash, receipts);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Delay every receipt answer by `delay`
    pub fn set_receipt_delay(&self, delay: Duration) {
        *self.receipt_delay.lock() = Some(delay);
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Deliver `header` on the current head subscription and make it canonical
    pub fn push_head(&self, header: BlockHeader) -> bool {
        self.insert_header(header);
        match self.head_tx.lock().as_ref() {
            Some(tx) => tx.unbounded_send(Ok(header)).is_ok(),
            None => false,
        }
    }

    /// Fail the current head subscription the way a dropped connection does
    pub fn fail_head_subscription(&self, reason: &str) {
        if let Some(tx) = self.head_tx.lock().take() {
            let _ = tx.unbounded_send(Err(L1SourceError::Stream(reason.to_string())));
        }
    }

    /// End the current head subscription without an error
    pub fn end_head_subscription(&self) {
        self.head_tx.lock().take();
    }

    pub fn has_head_subscription(&self) -> bool {
        self.head_tx
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn receipt_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), L1SourceError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(L1SourceError::Stream("mock read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl L1Source for MockL1Source {
    async fn header_by_number(&self, tag: BlockTag) -> Result<BlockHeader, L1SourceError> {
        self.check_reads()?;
        let headers = self.headers.lock();
        let header = match tag {
            BlockTag::Latest => headers.values().next_back(),
            BlockTag::Number(number) => headers.get(&number),
        };
        header
            .copied()
            .ok_or_else(|| L1SourceError::BlockNotFound(tag.to_string()))
    }

    async fn header_by_hash(&self, hash: B256) -> Result<BlockHeader, L1SourceError> {
        self.check_reads()?;
        self.headers
            .lock()
            .values()
            .find(|header| header.hash == hash)
            .copied()
            .ok_or_else(|| L1SourceError::BlockNotFound(hash.to_string()))
    }

    async fn block_receipts(&self, hash: B256) -> Result<Vec<RawReceipt>, L1SourceError> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.receipt_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(L1SourceError::Stream("mock read failure".to_string()));
        }
        Ok(self.receipts.lock().get(&hash).cloned().unwrap_or_default())
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, L1SourceError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(L1SourceError::Stream("mock subscribe failure".to_string()));
        }
        let (tx, rx) = unbounded();
        *self.head_tx.lock() = Some(tx);
        Ok(rx.boxed())
    }

    async fn close(&self) -> Result<(), L1SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.head_tx.lock().take();
        Ok(())
    }
}
