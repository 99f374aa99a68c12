//! Receipt Downloader - fetches and caches L1 receipts
//!
//! Jobs are queued on a shared channel and picked up by a pool of workers.
//! Results are cached by block hash, and callers asking for a block that is
//! already being fetched wait for that fetch, so every engine driver asking
//! for the same L1 block triggers a single source call. A failed fetch is not
//! shared: each waiting caller retries on its own.

use crate::{L1Source, L1SourceError};
use alloy_primitives::B256;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rollup_rpc::eth::RawReceipt;
use rollup_types::BlockId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Number of L1 blocks whose receipts are kept
pub const DEFAULT_RECEIPT_CACHE_BLOCKS: usize = 256;

/// Receipts of one block
pub type Receipts = Arc<Vec<RawReceipt>>;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Source(#[from] L1SourceError),

    #[error("downloader closed")]
    Closed,
}

struct ReceiptJob {
    block: BlockId,
    reply: oneshot::Sender<Result<Receipts, DownloadError>>,
}

/// Callers waiting on an in-flight fetch
type Waiters = Vec<oneshot::Sender<Receipts>>;

struct Inner {
    source: Arc<dyn L1Source>,
    cache: DashMap<B256, (u64, Receipts)>,
    pending: DashMap<B256, Waiters>,
    cache_blocks: usize,
}

impl Inner {
    fn cached(&self, hash: &B256) -> Option<Receipts> {
        self.cache.get(hash).map(|entry| entry.1.clone())
    }

    async fn fetch(&self, block: BlockId) -> Result<Receipts, DownloadError> {
        if let Some(receipts) = self.cached(&block.hash) {
            return Ok(receipts);
        }

        let receipts = Arc::new(self.source.block_receipts(block.hash).await?);
        self.cache.insert(block.hash, (block.number, receipts.clone()));

        if self.cache.len() > self.cache_blocks {
            let cutoff = block.number.saturating_sub(self.cache_blocks as u64);
            self.cache.retain(|_, (number, _)| *number > cutoff);
        }

        Ok(receipts)
    }
}

/// Marks a block as being fetched. Dropping it without completing releases
/// the waiters, which then retry.
struct PendingFetch<'a> {
    pending: &'a DashMap<B256, Waiters>,
    hash: Option<B256>,
}

impl<'a> PendingFetch<'a> {
    fn new(pending: &'a DashMap<B256, Waiters>, hash: B256) -> Self {
        Self {
            pending,
            hash: Some(hash),
        }
    }

    fn complete(mut self, receipts: &Receipts) {
        if let Some(waiters) = self.release() {
            for waiter in waiters {
                let _ = waiter.send(receipts.clone());
            }
        }
    }

    fn release(&mut self) -> Option<Waiters> {
        let hash = self.hash.take()?;
        self.pending.remove(&hash).map(|(_, waiters)| waiters)
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Fetches L1 receipts with a pool of parallel workers
pub struct Downloader {
    inner: Arc<Inner>,
    jobs_tx: mpsc::UnboundedSender<ReceiptJob>,
    jobs_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<ReceiptJob>>>,
    workers: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Downloader {
    /// Create a downloader without workers. Fetches run in-line until
    /// [`Downloader::add_receipt_workers`] is called.
    pub fn new(source: Arc<dyn L1Source>) -> Self {
        Self::with_cache_blocks(source, DEFAULT_RECEIPT_CACHE_BLOCKS)
    }

    pub fn with_cache_blocks(source: Arc<dyn L1Source>, cache_blocks: usize) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                source,
                cache: DashMap::new(),
                pending: DashMap::new(),
                cache_blocks,
            }),
            jobs_tx,
            jobs_rx: Arc::new(tokio::sync::Mutex::new(jobs_rx)),
            workers: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn `count` more receipt workers
    pub fn add_receipt_workers(&self, count: usize) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Not adding receipt workers to a closed downloader");
            return;
        }

        let mut handles = self.handles.lock();
        for _ in 0..count {
            let id = self.workers.fetch_add(1, Ordering::SeqCst);
            handles.push(tokio::spawn(run_worker(
                id,
                self.inner.clone(),
                self.jobs_rx.clone(),
                self.cancel.child_token(),
            )));
        }
        tracing::debug!("Receipt downloader running {} workers", handles.len());
    }

    /// Number of workers started so far
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }

    /// Number of blocks with cached receipts
    pub fn cached_blocks(&self) -> usize {
        self.inner.cache.len()
    }

    /// Receipts of `block`, from the cache, from a fetch already in flight,
    /// or fetched by a worker
    pub async fn fetch_receipts(&self, block: BlockId) -> Result<Receipts, DownloadError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(DownloadError::Closed);
            }
            if let Some(receipts) = self.inner.cached(&block.hash) {
                return Ok(receipts);
            }

            let waiter = match self.inner.pending.entry(block.hash) {
                Entry::Occupied(mut entry) => {
                    let (tx, rx) = oneshot::channel();
                    entry.get_mut().push(tx);
                    rx
                }
                Entry::Vacant(entry) => {
                    entry.insert(Vec::new());
                    break;
                }
            };
            if let Ok(receipts) = waiter.await {
                return Ok(receipts);
            }
        }

        let pending = PendingFetch::new(&self.inner.pending, block.hash);
        // A fetch may have completed between the cache check and the claim
        if let Some(receipts) = self.inner.cached(&block.hash) {
            pending.complete(&receipts);
            return Ok(receipts);
        }

        let res = self.download(block).await;
        if let Ok(receipts) = &res {
            pending.complete(receipts);
        }
        res
    }

    async fn download(&self, block: BlockId) -> Result<Receipts, DownloadError> {
        if self.worker_count() == 0 {
            return self.inner.fetch(block).await;
        }

        let (reply, rx) = oneshot::channel();
        self.jobs_tx
            .send(ReceiptJob { block, reply })
            .map_err(|_| DownloadError::Closed)?;
        rx.await.map_err(|_| DownloadError::Closed)?
    }

    /// Stop every worker. Pending and later fetches fail with
    /// [`DownloadError::Closed`].
    pub async fn close(&self) {
        self.cancel.cancel();
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Receipt worker did not exit cleanly: {}", e);
            }
        }
    }
}

async fn run_worker(
    id: usize,
    inner: Arc<Inner>,
    jobs: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<ReceiptJob>>>,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = async { jobs.lock().await.recv().await } => job,
        };
        let Some(job) = job else { break };

        tokio::select! {
            _ = cancel.cancelled() => break,
            res = inner.fetch(job.block) => {
                if let Err(e) = &res {
                    tracing::debug!("Receipt worker {} failed to fetch {}: {}", id, job.block, e);
                }
                let _ = job.reply.send(res);
            }
        }
    }
    tracing::debug!("Receipt worker {} stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_chain, MockL1Source};
    use serde_json::json;
    use std::time::Duration;

    fn source_with_receipts(blocks: u64) -> (Arc<MockL1Source>, Vec<BlockId>) {
        let chain = mock_chain(0, 0, blocks);
        let source = Arc::new(MockL1Source::with_chain(&chain));
        for header in &chain {
            source.insert_receipts(header.hash, vec![json!({ "block": header.number })]);
        }
        (source, chain.iter().map(|h| h.id()).collect())
    }

    #[tokio::test]
    async fn test_fetch_inline_without_workers() {
        let (source, blocks) = source_with_receipts(2);
        let downloader = Downloader::new(source.clone());

        let receipts = downloader.fetch_receipts(blocks[1]).await.unwrap();
        assert_eq!(receipts[0]["block"], 1);
        assert_eq!(downloader.worker_count(), 0);
    }

    #[tokio::test]
    async fn test_workers_fetch_and_cache() {
        let (source, blocks) = source_with_receipts(4);
        let downloader = Arc::new(Downloader::new(source.clone()));
        downloader.add_receipt_workers(4);
        assert_eq!(downloader.worker_count(), 4);

        let fetches = blocks.iter().map(|block| {
            let downloader = downloader.clone();
            let block = *block;
            tokio::spawn(async move { downloader.fetch_receipts(block).await })
        });
        for (i, handle) in fetches.enumerate() {
            let receipts = handle.await.unwrap().unwrap();
            assert_eq!(receipts[0]["block"], i as u64);
        }
        assert_eq!(source.receipt_calls(), 4);

        // Cached: no further source calls
        downloader.fetch_receipts(blocks[2]).await.unwrap();
        assert_eq!(source.receipt_calls(), 4);
        assert_eq!(downloader.cached_blocks(), 4);

        downloader.close().await;
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_source_call() {
        let (source, blocks) = source_with_receipts(2);
        source.set_receipt_delay(Duration::from_millis(50));
        let downloader = Downloader::new(source.clone());
        downloader.add_receipt_workers(4);

        let (a, b, c) = tokio::join!(
            downloader.fetch_receipts(blocks[1]),
            downloader.fetch_receipts(blocks[1]),
            downloader.fetch_receipts(blocks[1]),
        );
        for receipts in [a, b, c] {
            assert_eq!(receipts.unwrap()[0]["block"], 1);
        }
        assert_eq!(source.receipt_calls(), 1);
        assert!(downloader.inner.pending.is_empty());

        downloader.close().await;
    }

    #[tokio::test]
    async fn test_waiters_retry_after_failed_fetch() {
        let (source, blocks) = source_with_receipts(1);
        source.set_receipt_delay(Duration::from_millis(20));
        source.set_fail_reads(true);
        let downloader = Downloader::new(source.clone());

        let (a, b) = tokio::join!(
            downloader.fetch_receipts(blocks[0]),
            downloader.fetch_receipts(blocks[0]),
        );
        assert!(matches!(a, Err(DownloadError::Source(_))));
        assert!(matches!(b, Err(DownloadError::Source(_))));
        assert_eq!(source.receipt_calls(), 2);
        assert!(downloader.inner.pending.is_empty());

        source.set_fail_reads(false);
        let receipts = downloader.fetch_receipts(blocks[0]).await.unwrap();
        assert_eq!(receipts[0]["block"], 0);
    }

    #[tokio::test]
    async fn test_dropped_fetch_releases_waiters() {
        let (source, blocks) = source_with_receipts(1);
        source.set_receipt_delay(Duration::from_millis(100));
        let downloader = Downloader::new(source.clone());

        // The first caller gives up while its fetch is in flight
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            downloader.fetch_receipts(blocks[0]),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(downloader.inner.pending.is_empty());

        let receipts = downloader.fetch_receipts(blocks[0]).await.unwrap();
        assert_eq!(receipts[0]["block"], 0);
    }

    #[tokio::test]
    async fn test_cache_evicts_oldest_blocks() {
        let (source, blocks) = source_with_receipts(6);
        let downloader = Downloader::with_cache_blocks(source, 3);

        for block in &blocks {
            downloader.fetch_receipts(*block).await.unwrap();
        }
        assert!(downloader.cached_blocks() <= 3);
        assert!(downloader.inner.cache.contains_key(&blocks[5].hash));
        assert!(!downloader.inner.cache.contains_key(&blocks[0].hash));
    }

    #[tokio::test]
    async fn test_closed_downloader_rejects_fetches() {
        let (source, blocks) = source_with_receipts(1);
        let downloader = Downloader::new(source);
        downloader.add_receipt_workers(2);

        downloader.close().await;
        assert!(matches!(
            downloader.fetch_receipts(blocks[0]).await,
            Err(DownloadError::Closed)
        ));

        downloader.add_receipt_workers(1);
        assert_eq!(downloader.worker_count(), 2);
    }
}
