//! Operator notification seam.
//!
//! Concrete transports (mail, chat) implement [`Notifier`] outside this crate.
use std::sync::Arc;

use async_trait::async_trait;
use mooncaker_model::{ModelError, Notice};
use thiserror::Error;
use tracing::warn;

pub const KEY_REQUEST_SUBJECT: &str = "Mooncaker needs your attention";
pub const SUGGESTION_SUBJECT: &str = "A suggestion was submitted for Mooncaker!";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notice: {0}")]
    InvalidNotice(#[from] ModelError),

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Best-effort delivery of operator notices.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Notifier name used in logs.
    fn name(&self) -> &'static str;

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

pub type NotifierHandle = Arc<dyn Notifier>;

/// Notifier that only writes the notice to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        warn!(
            subject = %notice.subject,
            recipients = ?notice.recipients,
            "{}",
            notice.body
        );
        Ok(())
    }
}

/// Notice asking the operator for a fresh API key.
pub fn key_request_notice(recipients: Vec<String>) -> Notice {
    Notice::new(
        KEY_REQUEST_SUBJECT,
        "The crawler API key expired. Supply a new one with `set-api-key <key>` \
         from the admin console or the chat bot.",
        recipients,
    )
}

/// Notice forwarding a user suggestion.
pub fn suggestion_notice(recipients: Vec<String>, text: &str) -> Notice {
    Notice::new(SUGGESTION_SUBJECT, text, recipients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_request_mentions_console_command() {
        let notice = key_request_notice(vec!["ops@example.com".into()]);

        assert_eq!(notice.subject, KEY_REQUEST_SUBJECT);
        assert!(notice.body.contains("set-api-key"));
        assert!(notice.validate().is_ok());
    }

    #[test]
    fn suggestion_keeps_text() {
        let notice = suggestion_notice(vec!["ops@example.com".into()], "more cake");
        assert_eq!(notice.body, "more cake");
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notice = key_request_notice(Vec::new());
        assert!(LogNotifier.notify(&notice).await.is_ok());
    }
}
