//! Mail delivery for operator notices.
mod config;
pub use config::{MailConfig, MailTransportConfig, SmtpTls};

mod mailer;
pub use mailer::MailNotifier;
