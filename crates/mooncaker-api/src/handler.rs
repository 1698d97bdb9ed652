use async_trait::async_trait;
use mooncaker_core::{Console, NotifierHandle, suggestion_notice};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{AdminCredentials, ApiError, HttpConfig, SessionStore};

/// Admin API backend.
///
/// Routes only talk to this trait, so tests and alternative front-ends can
/// provide their own implementation.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Check operator credentials and open a session.
    async fn login(&self, username: &str, password: &str) -> Result<Uuid, ApiError>;

    /// Close a session.
    async fn logout(&self, token: &Uuid) -> Result<(), ApiError>;

    /// Fail with [`ApiError::Unauthenticated`] unless `token` is a live session.
    fn authorize(&self, token: &Uuid) -> Result<(), ApiError>;

    /// Run one console line and return its reply.
    async fn run_command(&self, line: &str) -> Result<String, ApiError>;

    /// Forward a user suggestion to the operators.
    async fn submit_suggestion(&self, text: &str) -> Result<(), ApiError>;

    /// Where `GET /` sends visitors.
    fn redirect_url(&self) -> &str;
}

/// Default [`ApiHandler`]: one operator account, the shared console and a notifier.
pub struct AdminService {
    credentials: AdminCredentials,
    sessions: SessionStore,
    console: Console,
    notifier: NotifierHandle,
    recipients: Vec<String>,
    redirect_url: String,
}

impl AdminService {
    pub fn new(
        http: &HttpConfig,
        credentials: AdminCredentials,
        console: Console,
        notifier: NotifierHandle,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            credentials,
            sessions: SessionStore::new(http.session_ttl),
            console,
            notifier,
            recipients,
            redirect_url: http.redirect_url.clone(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[async_trait]
impl ApiHandler for AdminService {
    #[instrument(level = "debug", skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<Uuid, ApiError> {
        let credentials = self.credentials.clone();
        let (user, pass) = (username.to_owned(), password.to_owned());
        let ok = tokio::task::spawn_blocking(move || credentials.verify(&user, &pass))
            .await
            .map_err(|e| ApiError::Internal(format!("password check failed: {e}")))?;

        if !ok {
            warn!(username, "failed operator login");
            return Err(ApiError::InvalidCredentials);
        }
        info!(username, "operator logged in");
        Ok(self.sessions.create())
    }

    async fn logout(&self, token: &Uuid) -> Result<(), ApiError> {
        if self.sessions.revoke(token) {
            info!("operator logged out");
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }

    fn authorize(&self, token: &Uuid) -> Result<(), ApiError> {
        if self.sessions.validate(token) {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }

    async fn run_command(&self, line: &str) -> Result<String, ApiError> {
        let console = self.console.clone();
        let line = line.to_owned();
        let res = tokio::task::spawn_blocking(move || console.execute(&line))
            .await
            .map_err(|e| ApiError::Internal(format!("console task failed: {e}")))?;
        Ok(res?)
    }

    async fn submit_suggestion(&self, text: &str) -> Result<(), ApiError> {
        if text.trim().is_empty() {
            return Err(ApiError::InvalidRequest("suggestion text is empty".into()));
        }
        let notice = suggestion_notice(self.recipients.clone(), text);
        self.notifier
            .notify(&notice)
            .await
            .map_err(|e| ApiError::Delivery(e.to_string()))?;
        info!(bytes = text.len(), "suggestion forwarded");
        Ok(())
    }

    fn redirect_url(&self) -> &str {
        &self.redirect_url
    }
}
