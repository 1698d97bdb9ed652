use std::sync::Arc;

use mooncaker_model::{AllowList, ApiKey, OperatorId};
use tracing::{debug, warn};

use super::{KeyError, KeySink};

/// Key sink that only accepts keys from allow-listed callers.
///
/// Rejected calls never reach the inner sink, so nothing changes and nobody wakes.
#[derive(Clone)]
pub struct GuardedSink {
    inner: Arc<dyn KeySink>,
    allow: Arc<AllowList>,
    observed: Option<Arc<dyn KeySink>>,
}

impl GuardedSink {
    pub fn new(inner: Arc<dyn KeySink>, allow: AllowList) -> Self {
        if allow.is_empty() {
            warn!("allow-list is empty; every external key update will be rejected");
        }
        Self {
            inner,
            allow: Arc::new(allow),
            observed: None,
        }
    }

    /// Answer [`KeySink::peek`] from `sink` instead of the inner transport.
    ///
    /// Queued transports cannot see the current key; the store they feed can.
    pub fn observing(mut self, sink: Arc<dyn KeySink>) -> Self {
        self.observed = Some(sink);
        self
    }

    fn peek(&self) -> Option<ApiKey> {
        match &self.observed {
            Some(sink) => sink.peek(),
            None => self.inner.peek(),
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    pub fn is_authorized(&self, caller: &OperatorId) -> bool {
        self.allow.contains(caller)
    }

    /// Check `caller` against the allow-list.
    pub fn authorize(&self, caller: &OperatorId) -> Result<(), KeyError> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "rejected key update from unauthorized caller");
            Err(KeyError::Unauthorized(caller.clone()))
        }
    }

    /// Forward `key` if `caller` is allowed.
    pub fn submit(&self, caller: &OperatorId, key: ApiKey) -> Result<(), KeyError> {
        self.authorize(caller)?;
        debug!(caller = %caller, key = %key, "accepted key update");
        self.inner.set_key(key)
    }

    /// Bind this guard to a caller, producing a plain [`KeySink`].
    pub fn for_caller(&self, caller: OperatorId) -> CallerSink {
        CallerSink {
            guard: self.clone(),
            caller,
        }
    }
}

/// [`GuardedSink`] bound to one caller identity.
#[derive(Clone)]
pub struct CallerSink {
    guard: GuardedSink,
    caller: OperatorId,
}

impl CallerSink {
    pub fn caller(&self) -> &OperatorId {
        &self.caller
    }
}

impl KeySink for CallerSink {
    fn set_key(&self, key: ApiKey) -> Result<(), KeyError> {
        self.guard.submit(&self.caller, key)
    }

    fn peek(&self) -> Option<ApiKey> {
        self.guard.peek()
    }
}
