//! Process configuration: TOML file merged with `MOONCAKER_*` environment variables.
use std::path::{Path, PathBuf};

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mooncaker_api::{AdminConfig, HttpConfig};
use mooncaker_notify::{MailConfig, MailTransportConfig};
use mooncaker_observe::LoggerConfig;
use mooncaker_workers::{BotConfig, CrawlerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file '{0}' not found")]
    Missing(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "mooncakerd", version, about = "Mooncaker admin console and background workers")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, env = "MOONCAKER_CONFIG", default_value = "mooncaker.toml")]
    pub config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    pub check: bool,
}

/// Outbound mail settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSection {
    /// When disabled, notices only go to the log.
    pub enabled: bool,
    pub from: String,
    /// Operators receiving key requests and suggestions.
    pub recipients: Vec<String>,
    pub transport: MailTransportConfig,
}

impl MailSection {
    pub fn mail_config(&self) -> MailConfig {
        MailConfig {
            from: self.from.clone(),
            transport: self.transport.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logger: LoggerConfig,
    pub http: HttpConfig,
    pub admin: AdminConfig,
    pub mail: MailSection,
    pub crawler: CrawlerConfig,
    pub bot: BotConfig,
}

impl Config {
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MOONCAKER_").ignore(&["config"]).split("__"))
    }

    /// Load and validate the configuration named by `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        if !args.config.is_file() {
            return Err(ConfigError::Missing(args.config.clone()));
        }
        let cfg: Config = Self::figment(&args.config).extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rules:
    /// - the admin account is complete;
    /// - enabled mail has a sender and at least one recipient;
    /// - enabled workers pass their own checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admin
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.mail.enabled {
            if self.mail.from.trim().is_empty() {
                return Err(ConfigError::Invalid("mail.from is empty".into()));
            }
            if !self.mail.recipients.iter().any(|r| !r.trim().is_empty()) {
                return Err(ConfigError::Invalid("mail.recipients is empty".into()));
            }
        }

        self.crawler
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.bot
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use mooncaker_model::OperatorId;
    use std::time::Duration;

    fn args(path: &str) -> Args {
        Args {
            config: PathBuf::from(path),
            check: false,
        }
    }

    fn base_toml() -> String {
        let hash = mooncaker_api::hash_password("password").unwrap();
        format!("[admin]\nusername = \"admin\"\npassword_hash = \"{hash}\"\n")
    }

    #[test]
    fn loads_sections_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mooncaker.toml",
                &format!(
                    r#"{base}
[http]
bind = "0.0.0.0:9000"
session_ttl = "1h"

[mail]
enabled = true
from = "Mooncaker <bot@example.com>"
recipients = ["ops@example.com"]
transport = {{ type = "file", path = "mail" }}

[crawler]
enabled = true
url = "https://data.example.com/feed"
interval = "10m"
key_wait_timeout = "6h"

[bot]
enabled = true
token = "123:abc"
allow_list = ["42"]
"#,
                    base = base_toml()
                ),
            )?;

            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;

            assert_eq!(cfg.http.bind.port(), 9000);
            assert_eq!(cfg.http.session_ttl, Duration::from_secs(3600));
            assert!(cfg.mail.enabled);
            assert!(matches!(cfg.mail.transport, MailTransportConfig::File { .. }));
            assert_eq!(cfg.crawler.interval, Duration::from_secs(600));
            assert_eq!(cfg.crawler.key_wait_timeout, Some(Duration::from_secs(6 * 3600)));
            assert!(cfg.bot.allow_list.contains(&OperatorId::from(42)));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("mooncaker.toml", &base_toml())?;
            jail.set_env("MOONCAKER_CONFIG", "mooncaker.toml");
            jail.set_env("MOONCAKER_ADMIN__USERNAME", "operator");
            jail.set_env("MOONCAKER_CRAWLER__KEY_PARAM", "token");

            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;

            assert_eq!(cfg.admin.username, "operator");
            assert_eq!(cfg.crawler.key_param, "token");
            assert!(cfg.crawler.key_wait_timeout.is_none());
            Ok(())
        });
    }

    #[test]
    fn allow_list_from_env_string() {
        Jail::expect_with(|jail| {
            jail.create_file("mooncaker.toml", &base_toml())?;
            jail.set_env("MOONCAKER_BOT__ENABLED", "true");
            jail.set_env("MOONCAKER_BOT__TOKEN", "123:abc");
            jail.set_env("MOONCAKER_BOT__ALLOW_LIST", "42 77");

            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;

            assert_eq!(cfg.bot.allow_list.len(), 2);
            assert!(cfg.bot.allow_list.contains(&OperatorId::from(42)));
            assert!(cfg.bot.allow_list.contains(&OperatorId::from(77)));
            Ok(())
        });
    }

    #[test]
    fn allow_list_from_env_array_and_single_id() {
        Jail::expect_with(|jail| {
            jail.create_file("mooncaker.toml", &base_toml())?;
            jail.set_env("MOONCAKER_BOT__ALLOW_LIST", "[42, 77]");

            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.bot.allow_list.len(), 2);

            jail.set_env("MOONCAKER_BOT__ALLOW_LIST", "42");
            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.bot.allow_list.len(), 1);
            assert!(cfg.bot.allow_list.contains(&OperatorId::from(42)));
            Ok(())
        });
    }

    #[test]
    fn allow_list_from_toml_integers() {
        Jail::expect_with(|jail| {
            let toml = format!(
                r#"{base}
[bot]
token = "123:abc"
allow_list = [42]
"#,
                base = base_toml()
            );
            jail.create_file("mooncaker.toml", &toml)?;

            let cfg = Config::load(&args("mooncaker.toml")).map_err(|e| e.to_string())?;

            assert_eq!(cfg.bot.allow_list.len(), 1);
            assert!(cfg.bot.allow_list.contains(&OperatorId::from(42)));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_fatal() {
        Jail::expect_with(|_jail| {
            let err = Config::load(&args("absent.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(_)));
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_fatal() {
        Jail::expect_with(|jail| {
            jail.create_file("mooncaker.toml", "[admin\nusername = ")?;

            let err = Config::load(&args("mooncaker.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn enabled_mail_needs_recipients() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mooncaker.toml",
                &format!(
                    "{}\n[mail]\nenabled = true\nfrom = \"bot@example.com\"\n",
                    base_toml()
                ),
            )?;

            let err = Config::load(&args("mooncaker.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("recipients")));
            Ok(())
        });
    }

    #[test]
    fn enabled_crawler_needs_url() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mooncaker.toml",
                &format!("{}\n[crawler]\nenabled = true\n", base_toml()),
            )?;

            assert!(matches!(
                Config::load(&args("mooncaker.toml")),
                Err(ConfigError::Invalid(_))
            ));
            Ok(())
        });
    }
}
