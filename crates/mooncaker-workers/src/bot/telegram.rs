use std::{fmt, time::Duration};

use async_trait::async_trait;
use mooncaker_model::OperatorId;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::trace;

use super::{BotConfig, BotError, ChatMessage, ChatTransport, ChatUpdate};

/// Telegram Bot API over `getUpdates` long polling.
pub struct TelegramTransport {
    client: Client,
    base: String,
    poll_timeout: Duration,
}

impl TelegramTransport {
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| BotError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            poll_timeout,
        })
    }

    pub fn from_config(cfg: &BotConfig) -> Result<Self, BotError> {
        cfg.validate()?;
        Self::new(&cfg.api_base, &cfg.token, cfg.poll_timeout)
    }

    fn method(&self, name: &str) -> String {
        format!("{}/{name}", self.base)
    }
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    chat: RawId,
    from: Option<RawId>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawId {
    id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl From<RawUpdate> for ChatUpdate {
    fn from(raw: RawUpdate) -> Self {
        let message = raw.message.and_then(|m| match (m.from, m.text) {
            (Some(from), Some(text)) => Some(ChatMessage {
                chat_id: m.chat.id,
                sender: OperatorId::from(from.id),
                text,
            }),
            _ => None,
        });
        ChatUpdate {
            update_id: raw.update_id,
            message,
        }
    }
}

// The token is part of every url: transport errors are reported without it.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BotError> {
    let envelope: Envelope<T> = resp
        .json()
        .await
        .map_err(|e| BotError::Transport(e.without_url().to_string()))?;
    if !envelope.ok {
        return Err(BotError::Api(
            envelope.description.unwrap_or_else(|| "request not ok".into()),
        ));
    }
    envelope
        .result
        .ok_or_else(|| BotError::Api("missing result".into()))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<ChatUpdate>, BotError> {
        let mut query = vec![("timeout", self.poll_timeout.as_secs().to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let resp = self
            .client
            .get(self.method("getUpdates"))
            .query(&query)
            .send()
            .await
            .map_err(|e| BotError::Transport(e.without_url().to_string()))?;
        let updates: Vec<RawUpdate> = decode(resp).await?;

        trace!(count = updates.len(), offset = ?offset, "polled chat updates");
        Ok(updates.into_iter().map(ChatUpdate::from).collect())
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        let resp = self
            .client
            .post(self.method("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(|e| BotError::Transport(e.without_url().to_string()))?;
        decode::<serde::de::IgnoredAny>(resp).await?;
        Ok(())
    }
}
