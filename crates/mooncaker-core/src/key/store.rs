use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use mooncaker_model::ApiKey;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::{KeyError, KeySink, KeySource};

#[derive(Default)]
struct Slot {
    key: Option<ApiKey>,
    closed: bool,
    waiters: usize,
}

#[derive(Default)]
struct Inner {
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// In-process key slot shared between producers and the crawler.
///
/// Cloning is cheap: clones refer to the same slot.
/// The slot is only read or written while holding its lock; waiters release the lock
/// while suspended on the condition variable.
#[derive(Clone, Default)]
pub struct KeyStore {
    inner: Arc<Inner>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an initial key.
    pub fn with_key(key: ApiKey) -> Self {
        let store = Self::new();
        store.inner.slot.lock().key = Some(key);
        store
    }

    /// Write a new key and wake all waiters.
    ///
    /// Returns [`KeyError::Closed`] after [`KeyStore::close`].
    pub fn set_key(&self, key: ApiKey) -> Result<(), KeyError> {
        let mut slot = self.inner.slot.lock();
        if slot.closed {
            return Err(KeyError::Closed);
        }
        debug!(key = %key, waiters = slot.waiters, "received a new api key");
        slot.key = Some(key);
        self.inner.ready.notify_all();
        Ok(())
    }

    /// Clear the slot and block until a producer supplies a new key.
    ///
    /// The returned key was always written after this call's clear.
    /// Blocks indefinitely unless the store is closed.
    pub fn await_key(&self) -> Result<ApiKey, KeyError> {
        self.await_key_with(None, None)
    }

    /// Like [`KeyStore::await_key`], giving up with [`KeyError::TimedOut`] after `timeout`.
    pub fn await_key_timeout(&self, timeout: Duration) -> Result<ApiKey, KeyError> {
        self.await_key_with(None, Some(timeout))
    }

    /// Clear the slot and wait, honoring an optional cancel token and timeout.
    ///
    /// Whoever cancels `cancel` must call [`KeyStore::wake`] afterwards so the waiter re-checks it.
    pub fn await_key_with(
        &self,
        cancel: Option<&CancellationToken>,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        let mut slot = self.inner.slot.lock();
        slot.key = None;
        trace!("api key cleared");
        self.wait_locked(&mut slot, cancel, timeout)
    }

    /// Wait for a key without clearing the slot first.
    pub fn wait_key_with(
        &self,
        cancel: Option<&CancellationToken>,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        let mut slot = self.inner.slot.lock();
        self.wait_locked(&mut slot, cancel, timeout)
    }

    /// Clear the slot without waiting.
    pub fn invalidate(&self) {
        self.inner.slot.lock().key = None;
        trace!("api key cleared");
    }

    /// Snapshot of the current key.
    pub fn current(&self) -> Option<ApiKey> {
        self.inner.slot.lock().key.clone()
    }

    /// Number of callers currently suspended in a wait.
    pub fn waiters(&self) -> usize {
        self.inner.slot.lock().waiters
    }

    /// Close the store: pending and future waits return [`KeyError::Closed`].
    pub fn close(&self) {
        let mut slot = self.inner.slot.lock();
        slot.closed = true;
        self.inner.ready.notify_all();
        info!(waiters = slot.waiters, "key store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slot.lock().closed
    }

    /// Wake all waiters so they re-check their exit conditions.
    pub fn wake(&self) {
        let _slot = self.inner.slot.lock();
        self.inner.ready.notify_all();
    }

    fn wait_locked(
        &self,
        slot: &mut MutexGuard<'_, Slot>,
        cancel: Option<&CancellationToken>,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        slot.waiters += 1;
        let result = loop {
            if let Some(key) = &slot.key {
                break Ok(key.clone());
            }
            if slot.closed {
                break Err(KeyError::Closed);
            }
            if cancel.is_some_and(|c| c.is_cancelled()) {
                break Err(KeyError::Canceled);
            }

            debug!("suspending until a new api key is provided");
            match deadline {
                Some(deadline) => {
                    if self.inner.ready.wait_until(slot, deadline).timed_out() {
                        break slot.key.clone().ok_or(KeyError::TimedOut);
                    }
                }
                None => self.inner.ready.wait(slot),
            }
        };
        slot.waiters -= 1;
        result
    }
}

impl KeySink for KeyStore {
    fn set_key(&self, key: ApiKey) -> Result<(), KeyError> {
        KeyStore::set_key(self, key)
    }

    fn peek(&self) -> Option<ApiKey> {
        self.current()
    }
}

#[async_trait]
impl KeySource for KeyStore {
    fn invalidate(&self) {
        KeyStore::invalidate(self);
    }

    /// Runs the blocking wait on the blocking pool.
    ///
    /// A watcher task wakes the condition variable when `cancel` fires.
    async fn wait_for_key(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        let waker = self.clone();
        let watched = cancel.clone();
        let watcher = tokio::spawn(async move {
            watched.cancelled().await;
            waker.wake();
        });

        let store = self.clone();
        let token = cancel.clone();
        let res =
            tokio::task::spawn_blocking(move || store.wait_key_with(Some(&token), timeout)).await;
        watcher.abort();

        res.map_err(|e| KeyError::Internal(format!("key wait task failed: {e}")))?
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("KeyStore")
            .field("key", &slot.key)
            .field("closed", &slot.closed)
            .field("waiters", &slot.waiters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{sync::mpsc, thread};

    fn key(s: &str) -> ApiKey {
        ApiKey::new(s).unwrap()
    }

    fn wait_for_waiters(store: &KeyStore, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.waiters() < n {
            assert!(Instant::now() < deadline, "consumer never started waiting");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn spawn_consumer(store: &KeyStore) -> thread::JoinHandle<Result<ApiKey, KeyError>> {
        let store = store.clone();
        thread::spawn(move || store.await_key())
    }

    #[test]
    fn returns_key_set_while_waiting() {
        let store = KeyStore::new();
        let consumer = spawn_consumer(&store);

        wait_for_waiters(&store, 1);
        store.set_key(key("k-1")).unwrap();

        assert_eq!(consumer.join().unwrap(), Ok(key("k-1")));
    }

    #[test]
    fn fresh_store_blocks_until_producer_sets() {
        let store = KeyStore::new();
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let store = store.clone();
            thread::spawn(move || tx.send(store.await_key()).unwrap())
        };

        wait_for_waiters(&store, 1);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        store.set_key(key("late")).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Ok(key("late")));
        consumer.join().unwrap();
    }

    #[test]
    fn await_clears_previous_key() {
        let store = KeyStore::with_key(key("stale"));

        let res = store.await_key_timeout(Duration::from_millis(20));

        assert_eq!(res, Err(KeyError::TimedOut));
        assert_eq!(store.current(), None);
    }

    #[test]
    fn sequential_cycles_are_independent_even_for_equal_keys() {
        let store = KeyStore::new();

        let first = spawn_consumer(&store);
        wait_for_waiters(&store, 1);
        store.set_key(key("same")).unwrap();
        assert_eq!(first.join().unwrap(), Ok(key("same")));

        let second = spawn_consumer(&store);
        wait_for_waiters(&store, 1);
        assert!(!second.is_finished());
        store.set_key(key("same")).unwrap();
        assert_eq!(second.join().unwrap(), Ok(key("same")));
    }

    #[test]
    fn racing_producers_deliver_one_whole_value() {
        let store = KeyStore::new();
        let consumer = spawn_consumer(&store);
        wait_for_waiters(&store, 1);

        let producers: Vec<_> = ["alpha-key", "omega-key"]
            .into_iter()
            .map(|k| {
                let store = store.clone();
                thread::spawn(move || store.set_key(key(k)).unwrap())
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let got = consumer.join().unwrap().unwrap();
        assert!(got == key("alpha-key") || got == key("omega-key"), "got {got:?}");
        let current = store.current();
        assert!(current == Some(key("alpha-key")) || current == Some(key("omega-key")));
    }

    #[test]
    fn scenario_two_back_to_back_cycles() {
        let store = KeyStore::new();

        let consumer = {
            let store = store.clone();
            thread::spawn(move || {
                let first = store.await_key();
                let second = store.await_key();
                (first, second)
            })
        };

        wait_for_waiters(&store, 1);
        store.set_key(key("ABC123")).unwrap();

        // The second await clears the slot again before suspending.
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.current().is_some() || store.waiters() == 0 {
            assert!(Instant::now() < deadline, "second wait never started");
            thread::sleep(Duration::from_millis(1));
        }
        store.set_key(key("XYZ789")).unwrap();

        let (first, second) = consumer.join().unwrap();
        assert_eq!(first, Ok(key("ABC123")));
        assert_eq!(second, Ok(key("XYZ789")));
    }

    #[test]
    fn close_releases_waiters_and_rejects_writes() {
        let store = KeyStore::new();
        let consumer = spawn_consumer(&store);
        wait_for_waiters(&store, 1);

        store.close();

        assert_eq!(consumer.join().unwrap(), Err(KeyError::Closed));
        assert_eq!(store.set_key(key("after")), Err(KeyError::Closed));
        assert!(store.is_closed());
    }

    #[test]
    fn cancel_then_wake_releases_waiter() {
        let store = KeyStore::new();
        let token = CancellationToken::new();
        let consumer = {
            let store = store.clone();
            let token = token.clone();
            thread::spawn(move || store.await_key_with(Some(&token), None))
        };
        wait_for_waiters(&store, 1);

        token.cancel();
        store.wake();

        assert_eq!(consumer.join().unwrap(), Err(KeyError::Canceled));
        assert_eq!(store.waiters(), 0);
    }

    #[test]
    fn debug_output_masks_key() {
        let store = KeyStore::with_key(key("SECRET"));
        let out = format!("{store:?}");
        assert!(out.contains("SE***"));
        assert!(!out.contains("SECRET"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_source_receives_key() {
        let store = KeyStore::new();
        let cancel = CancellationToken::new();

        let consumer = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { store.next_key(&cancel, None).await })
        };

        while store.waiters() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        store.set_key(key("async-key")).unwrap();

        assert_eq!(consumer.await.unwrap(), Ok(key("async-key")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_source_observes_cancellation() {
        let store = KeyStore::new();
        let cancel = CancellationToken::new();

        let consumer = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { store.next_key(&cancel, None).await })
        };

        while store.waiters() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();

        assert_eq!(consumer.await.unwrap(), Err(KeyError::Canceled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_source_times_out() {
        let store = KeyStore::new();
        let cancel = CancellationToken::new();

        let res = store.next_key(&cancel, Some(Duration::from_millis(20))).await;

        assert_eq!(res, Err(KeyError::TimedOut));
    }
}
