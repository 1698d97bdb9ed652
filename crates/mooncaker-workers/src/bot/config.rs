use std::time::Duration;

use mooncaker_model::AllowList;
use serde::{Deserialize, Serialize};

use super::BotError;

/// Chat bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub enabled: bool,
    /// Bot token issued by the chat provider.
    pub token: String,
    pub api_base: String,
    /// Chat user ids allowed to run commands.
    pub allow_list: AllowList,
    /// Long-poll duration of a single `getUpdates` call.
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            api_base: "https://api.telegram.org".into(),
            allow_list: AllowList::new(),
            poll_timeout: Duration::from_secs(30),
        }
    }
}

impl BotConfig {
    /// Rules (only checked when enabled):
    /// - `token` is not blank;
    /// - `api_base` is an absolute url.
    pub fn validate(&self) -> Result<(), BotError> {
        if !self.enabled {
            return Ok(());
        }
        if self.token.trim().is_empty() {
            return Err(BotError::InvalidConfig("bot.token is empty".into()));
        }
        reqwest::Url::parse(&self.api_base).map_err(|e| {
            BotError::InvalidConfig(format!("bot.api_base '{}': {e}", self.api_base))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooncaker_model::OperatorId;

    #[test]
    fn enabled_bot_needs_token() {
        let cfg = BotConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(BotError::InvalidConfig(_))));
    }

    #[test]
    fn parses_allow_list_and_timeout() {
        let cfg: BotConfig = serde_json::from_str(
            r#"{
                "enabled": true,
                "token": "123:abc",
                "allow_list": ["42", "77"],
                "poll_timeout": "10s"
            }"#,
        )
        .unwrap();

        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.poll_timeout, Duration::from_secs(10));
        assert!(cfg.allow_list.contains(&OperatorId::from(42)));
        assert_eq!(cfg.allow_list.len(), 2);
    }
}
