//! Key refresh flow used by the crawler when its key stops working.
use std::{sync::Arc, time::Duration};

use mooncaker_model::ApiKey;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::{
    key::{KeyError, KeySource},
    notify::{NotifierHandle, key_request_notice},
};

/// Clears the key source, notifies the operator and waits for the replacement.
///
/// The notice is sent in the background: delivery problems are logged and
/// never delay or fail the wait.
#[derive(Clone)]
pub struct KeyBroker {
    source: Arc<dyn KeySource>,
    notifier: NotifierHandle,
    recipients: Vec<String>,
    wait_timeout: Option<Duration>,
}

impl KeyBroker {
    pub fn new(
        source: Arc<dyn KeySource>,
        notifier: NotifierHandle,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            recipients,
            wait_timeout: None,
        }
    }

    /// Give up waiting after `timeout`. `None` waits until a key arrives.
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    /// Obtain a new key after the current one was rejected.
    #[instrument(level = "debug", skip_all, fields(notifier = self.notifier.name()))]
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<ApiKey, KeyError> {
        self.source.invalidate();
        info!("api key invalidated; asking the operator for a new one");

        let notifier = Arc::clone(&self.notifier);
        let notice = key_request_notice(self.recipients.clone());
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notice).await {
                error!(
                    notifier = notifier.name(),
                    error = %e,
                    "failed to deliver key request notice"
                );
            }
        });

        let key = self.source.wait_for_key(cancel, self.wait_timeout).await?;
        info!(key = %key, "resuming with a new api key");
        Ok(key)
    }
}
