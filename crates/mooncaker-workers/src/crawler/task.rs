use std::{sync::Arc, time::Duration};

use mooncaker_core::{KeyBroker, KeyError};
use mooncaker_model::ApiKey;
use parking_lot::Mutex;
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{CrawlError, CrawlJob, CrawlReport};

pub const CRAWLER_TASK_NAME: &str = "mooncaker-crawler";

/// Crawl loop state shared by every (re)start of the task.
///
/// The current key survives restarts: a worker restarted after a transient
/// failure keeps the key it had, one restarted after a rejection asks again.
pub(crate) struct CrawlerWorker {
    job: Arc<dyn CrawlJob>,
    broker: KeyBroker,
    key: Mutex<Option<ApiKey>>,
    interval: Duration,
}

impl CrawlerWorker {
    pub(crate) fn new(
        job: Arc<dyn CrawlJob>,
        broker: KeyBroker,
        initial_key: Option<ApiKey>,
        interval: Duration,
    ) -> Self {
        Self {
            job,
            broker,
            key: Mutex::new(initial_key),
            interval,
        }
    }

    /// Crawl until cancellation; `Ok` only when the key transport shuts down.
    pub(crate) async fn run(&self, cancel: &CancellationToken) -> Result<(), TaskError> {
        loop {
            match self.pass(cancel).await {
                Ok(report) => info!(
                    status = report.status,
                    bytes = report.bytes,
                    output = ?report.output,
                    "crawl pass complete"
                ),
                Err(KeyWait::Closed) => {
                    info!("key transport closed; crawler stopping");
                    return Ok(());
                }
                Err(KeyWait::Task(e)) => return Err(e),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(TaskError::Canceled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// One successful crawl, refreshing the key as many times as the upstream rejects it.
    pub(crate) async fn pass(&self, cancel: &CancellationToken) -> Result<CrawlReport, KeyWait> {
        loop {
            let current = self.key.lock().clone();
            let key = match current {
                Some(key) => key,
                None => self.refresh(cancel).await?,
            };

            let res = tokio::select! {
                _ = cancel.cancelled() => return Err(KeyWait::Task(TaskError::Canceled)),
                res = self.job.crawl(&key) => res,
            };
            match res {
                Ok(report) => return Ok(report),
                Err(CrawlError::KeyRejected(reason)) => {
                    warn!(key = %key, reason = %reason, "api key rejected");
                    *self.key.lock() = None;
                }
                Err(e) => {
                    return Err(KeyWait::Task(TaskError::Fail {
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn refresh(&self, cancel: &CancellationToken) -> Result<ApiKey, KeyWait> {
        let key = self.broker.refresh(cancel).await.map_err(KeyWait::from)?;
        *self.key.lock() = Some(key.clone());
        Ok(key)
    }
}

pub(crate) enum KeyWait {
    Closed,
    Task(TaskError),
}

impl From<KeyError> for KeyWait {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::Closed => KeyWait::Closed,
            KeyError::Canceled => KeyWait::Task(TaskError::Canceled),
            other => KeyWait::Task(TaskError::Fail {
                reason: other.to_string(),
            }),
        }
    }
}

/// Build the crawler task.
///
/// Transient crawl errors and key wait timeouts fail the task so the supervisor's backoff applies.
/// Without `initial_key` the first pass asks the operator for one.
pub fn crawler_task(
    job: Arc<dyn CrawlJob>,
    broker: KeyBroker,
    initial_key: Option<ApiKey>,
    interval: Duration,
) -> TaskRef {
    let worker = Arc::new(CrawlerWorker::new(job, broker, initial_key, interval));

    TaskFn::arc(CRAWLER_TASK_NAME, move |cancel: CancellationToken| {
        let worker = Arc::clone(&worker);
        async move { worker.run(&cancel).await }
    })
}
