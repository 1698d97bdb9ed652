#![cfg(feature = "subscriber")]

//! Worker lifecycle logging for taskvisor events.
//!
//! Worker restarts and failures (crawler, chat bot, key relay) end up in the
//! same log the operator reads through `get-log`.
use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

/// Subscriber that logs taskvisor events using the tracing framework.
#[derive(Default)]
pub struct Subscriber;

/// Worker events are rare; a small queue is enough.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

#[async_trait]
impl Subscribe for Subscriber {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "mooncaker-subscriber"
    }

    fn queue_capacity(&self) -> usize {
        SUBSCRIBER_QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let worker = e.task.as_deref().unwrap_or("unknown");
    let reason = e.reason.as_deref().unwrap_or("unknown");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => info!(worker, attempt, "worker starting"),
        EventKind::TaskStopped => debug!(worker, "worker stopped"),
        EventKind::TaskFailed => error!(worker, attempt, reason, "worker failed"),
        EventKind::TimeoutHit => warn!(worker, "worker exceeded its timeout"),
        EventKind::BackoffScheduled => debug!(
            worker,
            attempt,
            delay_ms = e.delay_ms.unwrap_or(0),
            "worker restart scheduled"
        ),
        EventKind::ActorExhausted => warn!(worker, reason, "worker will not be restarted"),
        EventKind::ActorDead => error!(worker, reason, "worker terminated permanently"),
        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all workers stopped within grace period"),
        EventKind::GraceExceeded => warn!("some workers did not stop in time"),
        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(worker, reason, "event subscriber failure")
        }
        EventKind::ControllerRejected => warn!(worker, reason, "worker submission rejected"),
        _ => trace!(worker, kind = ?e.kind, "supervisor event"),
    }
}
