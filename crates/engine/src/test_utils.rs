//! Test utilities for code driving an [`EngineApi`]

use crate::{EngineApi, EngineError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rollup_types::BlockHeader;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Engine stub reporting a configurable head
#[derive(Default)]
pub struct MockEngine {
    head: Mutex<Option<BlockHeader>>,
    hang: AtomicBool,
    closed: AtomicBool,
    head_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new(head: BlockHeader) -> Self {
        let engine = Self::default();
        engine.set_head(head);
        engine
    }

    /// Engine that never reports a head
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn set_head(&self, head: BlockHeader) {
        *self.head.lock() = Some(head);
    }

    /// Make head requests hang forever
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineApi for MockEngine {
    async fn head(&self) -> Result<BlockHeader, EngineError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        if self.hang.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        let head = *self.head.lock();
        head.ok_or(EngineError::HeadNotFound)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
