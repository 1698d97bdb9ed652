//! Chat bot worker: operator console over a chat transport with caller allow-listing.
mod config;
pub use config::BotConfig;

mod telegram;
pub use telegram::TelegramTransport;

mod worker;
pub use worker::{BotWorker, UNAUTHORIZED_REPLY, bot_task};

use async_trait::async_trait;
use mooncaker_model::OperatorId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("chat transport failed: {0}")]
    Transport(String),

    #[error("chat api error: {0}")]
    Api(String),

    #[error("invalid bot configuration: {0}")]
    InvalidConfig(String),
}

/// Text message from a chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub chat_id: i64,
    pub sender: OperatorId,
    pub text: String,
}

/// One polled update. Updates without a text message still advance the offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
    pub update_id: i64,
    pub message: Option<ChatMessage>,
}

/// Long-polling chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Fetch updates with ids `>= offset`, blocking up to the transport's poll timeout.
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<ChatUpdate>, BotError>;

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), BotError>;
}
