use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Mail notifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address, e.g. `"Mooncaker <bot@example.com>"`.
    pub from: String,
    pub transport: MailTransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MailTransportConfig {
    /// Send through an SMTP relay.
    Smtp {
        host: String,
        #[serde(default = "default_smtp_port")]
        port: u16,
        username: String,
        password: String,
        #[serde(default)]
        tls: SmtpTls,
    },
    /// Write `.eml` files into a directory (development and tests).
    File { path: PathBuf },
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (usually port 465).
    Wrapper,
    /// No encryption.
    None,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for MailTransportConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from("./emails"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_defaults_to_starttls_on_587() {
        let json =
            r#"{"type": "smtp", "host": "mail.example.com", "username": "u", "password": "p"}"#;
        let cfg: MailTransportConfig = serde_json::from_str(json).unwrap();

        match cfg {
            MailTransportConfig::Smtp { port, tls, .. } => {
                assert_eq!(port, 587);
                assert_eq!(tls, SmtpTls::Starttls);
            }
            other => panic!("expected smtp transport, got {other:?}"),
        }
    }

    #[test]
    fn file_transport_parses() {
        let cfg: MailTransportConfig =
            serde_json::from_str(r#"{"type": "file", "path": "/tmp/mail"}"#).unwrap();
        assert!(matches!(
            cfg,
            MailTransportConfig::File { path } if path == PathBuf::from("/tmp/mail")
        ));
    }
}
