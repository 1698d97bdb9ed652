use async_trait::async_trait;
use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, warn};

use crate::config::{MailConfig, MailTransportConfig, SmtpTls};
use mooncaker_core::{Notifier, NotifyError};
use mooncaker_model::Notice;

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// [`Notifier`] that delivers notices by mail.
pub struct MailNotifier {
    transport: Transport,
    from: Mailbox,
}

impl MailNotifier {
    pub fn new(cfg: &MailConfig) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&cfg.from)?;

        let transport = match &cfg.transport {
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                tls,
            } => {
                let builder = match tls {
                    SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
                    SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
                    SmtpTls::None => {
                        warn!("SMTP TLS is disabled - this is not recommended for production");
                        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                    }
                }
                .map_err(|e| NotifyError::Build(format!("create SMTP transport: {e}")))?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                Transport::Smtp(builder.build())
            }
            MailTransportConfig::File { path } => {
                std::fs::create_dir_all(path)
                    .map_err(|e| NotifyError::Build(format!("create mail directory: {e}")))?;
                Transport::File(AsyncFileTransport::<Tokio1Executor>::new(path))
            }
        };

        Ok(Self { transport, from })
    }

    fn build_message(&self, notice: &Notice) -> Result<Message, NotifyError> {
        notice.validate()?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notice.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for rcpt in notice.recipients.iter().filter(|r| !r.trim().is_empty()) {
            builder = builder.to(parse_mailbox(rcpt)?);
        }

        builder
            .body(notice.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    fn name(&self) -> &'static str {
        "mail"
    }

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        let message = self.build_message(notice)?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| NotifyError::Delivery(format!("send SMTP mail: {e}")))?;
            }
            Transport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| NotifyError::Delivery(format!("write mail file: {e}")))?;
            }
        }
        debug!(subject = %notice.subject, recipients = notice.recipients.len(), "notice mailed");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
