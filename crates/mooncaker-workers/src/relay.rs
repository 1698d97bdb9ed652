//! Bridges keys queued by out-of-process producers (the chat bot) into the crawler's store.
use std::sync::Arc;

use mooncaker_core::{KeyError, KeyQueue, KeySink};
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const RELAY_TASK_NAME: &str = "mooncaker-key-relay";

/// Build the relay task: every key taken from `queue` is written to `sink`.
///
/// The task ends with `Ok` when the queue closes and with `Canceled` on shutdown.
/// A sink that refuses keys (closed store) fails the task.
pub fn relay_task(queue: Arc<KeyQueue>, sink: Arc<dyn KeySink>) -> TaskRef {
    TaskFn::arc(RELAY_TASK_NAME, move |cancel: CancellationToken| {
        let queue = Arc::clone(&queue);
        let sink = Arc::clone(&sink);
        async move {
            info!("key relay started");
            match queue.forward_to(sink.as_ref(), &cancel).await {
                Ok(()) if cancel.is_cancelled() => Err(TaskError::Canceled),
                Ok(()) => {
                    info!("key queue closed; relay stopping");
                    Ok(())
                }
                Err(KeyError::Closed) => Ok(()),
                Err(e) => Err(TaskError::Fail {
                    reason: format!("key relay failed: {e}"),
                }),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooncaker_core::KeyStore;
    use mooncaker_model::ApiKey;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_key_wakes_store_consumer() {
        let queue = Arc::new(KeyQueue::new());
        let store = KeyStore::new();
        let cancel = CancellationToken::new();

        let relay = {
            let queue = Arc::clone(&queue);
            let sink: Arc<dyn KeySink> = Arc::new(store.clone());
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.forward_to(sink.as_ref(), &cancel).await })
        };

        let consumer = {
            let store = store.clone();
            tokio::task::spawn_blocking(move || store.await_key_timeout(Duration::from_secs(5)))
        };
        while store.waiters() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        queue.sender().set_key(ApiKey::new("from-bot").unwrap()).unwrap();

        assert_eq!(consumer.await.unwrap(), Ok(ApiKey::new("from-bot").unwrap()));
        cancel.cancel();
        assert_eq!(relay.await.unwrap(), Ok(()));
    }
}
