//! Handoff of the working API key between producers and the crawler.
//!
//! Two transports share one contract:
//! - [`KeyStore`]: in-process slot guarded by a lock and a condition variable;
//! - [`KeyQueue`]: message channel used by producers living in another worker.
//!
//! Producers only see [`KeySink`]; the consumer only sees [`KeySource`].
//! Every wait delivers exactly one key that was written after the consumer's own clear.
mod error;
pub use error::KeyError;

mod store;
pub use store::KeyStore;

mod queue;
pub use queue::{KeyQueue, KeyQueueSender};

mod guard;
pub use guard::{CallerSink, GuardedSink};

use std::time::Duration;

use async_trait::async_trait;
use mooncaker_model::ApiKey;
use tokio_util::sync::CancellationToken;

/// Producer side of the handoff.
pub trait KeySink: Send + Sync {
    /// Store a new key and wake the waiting consumer.
    ///
    /// Never blocks beyond lock contention. The latest write wins.
    fn set_key(&self, key: ApiKey) -> Result<(), KeyError>;

    /// Current key, if the transport can observe it.
    fn peek(&self) -> Option<ApiKey> {
        None
    }
}

/// Consumer side of the handoff.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Mark the current key invalid.
    fn invalidate(&self);

    /// Wait for a key without clearing first.
    ///
    /// `timeout = None` waits until a key arrives, the transport is closed or `cancel` fires.
    async fn wait_for_key(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError>;

    /// Invalidate, then wait for a fresh key.
    async fn next_key(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ApiKey, KeyError> {
        self.invalidate();
        self.wait_for_key(cancel, timeout).await
    }
}
