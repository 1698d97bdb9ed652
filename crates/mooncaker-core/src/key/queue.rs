use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mooncaker_model::ApiKey;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{KeyError, KeySink, KeySource};

/// Queued key transport for producers that live outside the consumer's worker.
///
/// Producers hold a [`KeyQueueSender`]; waits are served one at a time.
/// Every key is stamped with the clear generation it was queued in, and keys
/// from an older generation are never delivered, even when the clear raced an
/// in-flight wait. When several keys are queued at wake time the last one wins.
pub struct KeyQueue {
    tx: mpsc::UnboundedSender<Stamped>,
    rx: Mutex<mpsc::UnboundedReceiver<Stamped>>,
    generation: Arc<AtomicU64>,
    closed: CancellationToken,
}

/// Cloneable producer handle for a [`KeyQueue`].
#[derive(Clone)]
pub struct KeyQueueSender {
    tx: mpsc::UnboundedSender<Stamped>,
    generation: Arc<AtomicU64>,
    closed: CancellationToken,
}

struct Stamped {
    generation: u64,
    key: ApiKey,
}

impl KeyQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            generation: Arc::new(AtomicU64::new(0)),
            closed: CancellationToken::new(),
        }
    }

    /// Producer handle that can be moved into another worker.
    pub fn sender(&self) -> KeyQueueSender {
        KeyQueueSender {
            tx: self.tx.clone(),
            generation: Arc::clone(&self.generation),
            closed: self.closed.clone(),
        }
    }

    /// Close the queue: waits return [`KeyError::Closed`], senders are refused.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Forward every queued key into `sink` until the queue closes or `cancel` fires.
    ///
    /// Used to bridge a remote producer into the in-process [`super::KeyStore`].
    pub async fn forward_to(
        &self,
        sink: &dyn KeySink,
        cancel: &CancellationToken,
    ) -> Result<(), KeyError> {
        loop {
            match self.wait_for_key(cancel, None).await {
                Ok(key) => {
                    debug!(key = %key, "forwarding queued api key");
                    sink.set_key(key)?;
                }
                Err(KeyError::Canceled) | Err(KeyError::Closed) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn is_current(&self, item: &Stamped) -> bool {
        item.generation >= self.generation.load(Ordering::Acquire)
    }

    async fn recv(
        &self,
        rx: &mut mpsc::UnboundedReceiver<Stamped>,
        cancel: &CancellationToken,
    ) -> Result<ApiKey, KeyError> {
        loop {
            let mut latest = tokio::select! {
                biased;
                _ = self.closed.cancelled() => return Err(KeyError::Closed),
                _ = cancel.cancelled() => return Err(KeyError::Canceled),
                next = rx.recv() => next.ok_or(KeyError::Closed)?,
            };
            while let Ok(newer) = rx.try_recv() {
                latest = newer;
            }
            if self.is_current(&latest) {
                return Ok(latest.key);
            }
            trace!(generation = latest.generation, "dropping key queued before clear");
        }
    }
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySink for KeyQueue {
    fn set_key(&self, key: ApiKey) -> Result<(), KeyError> {
        self.sender().set_key(key)
    }
}

impl KeySink for KeyQueueSender {
    fn set_key(&self, key: ApiKey) -> Result<(), KeyError> {
        if self.closed.is_cancelled() {
            return Err(KeyError::Closed);
        }
        trace!(key = %key, "enqueuing api key");
        let generation = self.generation.load(Ordering::Acquire);
        self.tx
            .send(Stamped { generation, key })
            .map_err(|_| KeyError::Closed)
    }
}

#[async_trait]
impl KeySource for KeyQueue {
    /// Drops every key queued so far.
    ///
    /// Bumps the generation first, so a wait that currently owns the receiver
    /// also skips the stale keys; the buffer is drained here when it is free.
    fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Ok(mut rx) = self.rx.try_lock() {
            let mut dropped = 0usize;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            trace!(generation, dropped, "key queue cleared");
        } else {
            trace!(generation, "key queue cleared while a wait is in flight");
        }
    }

    async fn wait_for_key(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        let mut rx = self.rx.lock().await;
        match timeout {
            Some(t) => tokio::time::timeout(t, self.recv(&mut rx, cancel))
                .await
                .map_err(|_| KeyError::TimedOut)?,
            None => self.recv(&mut rx, cancel).await,
        }
    }
}
