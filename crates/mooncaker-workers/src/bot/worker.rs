use std::sync::Arc;

use mooncaker_core::{Console, GuardedSink};
use parking_lot::Mutex;
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BotError, ChatMessage, ChatTransport};

pub const BOT_TASK_NAME: &str = "mooncaker-bot";
pub const UNAUTHORIZED_REPLY: &str = "You are not authorized";

/// Upper bound of a single chat message.
const MAX_REPLY_CHARS: usize = 4096;

/// Runs console commands received over a [`ChatTransport`].
///
/// Every command runs with a key sink bound to its sender, so `set-api-key`
/// from a caller outside the allow-list never reaches the key transport.
pub struct BotWorker {
    transport: Arc<dyn ChatTransport>,
    console: Console,
    guard: GuardedSink,
    offset: Mutex<Option<i64>>,
}

impl BotWorker {
    pub fn new(transport: Arc<dyn ChatTransport>, console: Console, guard: GuardedSink) -> Self {
        Self {
            transport,
            console,
            guard,
            offset: Mutex::new(None),
        }
    }

    /// Reply for one message; `None` when the message is not a command.
    pub fn handle(&self, msg: &ChatMessage) -> Option<String> {
        let line = command_line(&msg.text)?;
        if self.guard.authorize(&msg.sender).is_err() {
            return Some(UNAUTHORIZED_REPLY.to_string());
        }

        debug!(sender = %msg.sender, chat = msg.chat_id, "chat command");
        let console = self
            .console
            .with_sink(Arc::new(self.guard.for_caller(msg.sender.clone())));
        let reply = match console.execute(&line) {
            Ok(out) => out,
            Err(e) => e.to_string(),
        };
        Some(fit_reply(reply))
    }

    /// Poll once, answer every command, advance the offset. Returns the number of updates.
    pub async fn poll_once(&self) -> Result<usize, BotError> {
        let offset = *self.offset.lock();
        let updates = self.transport.poll(offset).await?;

        for update in &updates {
            *self.offset.lock() = Some(update.update_id + 1);

            let Some(msg) = &update.message else { continue };
            let Some(reply) = self.handle(msg) else { continue };
            if let Err(e) = self.transport.reply(msg.chat_id, &reply).await {
                warn!(chat = msg.chat_id, error = %e, "failed to send chat reply");
            }
        }
        Ok(updates.len())
    }

    /// Poll until cancellation; transport failures end the run for the supervisor to back off.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), TaskError> {
        info!(allowed = self.guard.allow_list().len(), "chat bot polling");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskError::Canceled),
                res = self.poll_once() => {
                    res.map_err(|e| TaskError::Fail { reason: e.to_string() })?;
                }
            }
        }
    }
}

/// Build the bot polling task.
pub fn bot_task(
    transport: Arc<dyn ChatTransport>,
    console: Console,
    guard: GuardedSink,
) -> TaskRef {
    let worker = Arc::new(BotWorker::new(transport, console, guard));

    TaskFn::arc(BOT_TASK_NAME, move |cancel: CancellationToken| {
        let worker = Arc::clone(&worker);
        async move { worker.run(&cancel).await }
    })
}

/// Turn `/set_api_key@SomeBot KEY` into `set-api-key KEY`.
fn command_line(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head).replace('_', "-");
    let name = match name.as_str() {
        "" => return None,
        "start" => "help".to_string(),
        _ => name,
    };

    if args.is_empty() {
        Some(name)
    } else {
        Some(format!("{name} {args}"))
    }
}

/// Keep the tail of long replies (log output) within one message.
fn fit_reply(reply: String) -> String {
    if reply.trim().is_empty() {
        return "(empty)".to_string();
    }
    let count = reply.chars().count();
    if count <= MAX_REPLY_CHARS {
        return reply;
    }
    let skip = count - (MAX_REPLY_CHARS - 4);
    let tail: String = reply.chars().skip(skip).collect();
    format!("...\n{tail}")
}
