use std::{net::SocketAddr, time::Duration};

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};

use crate::ApiError;

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: SocketAddr,
    /// Target of `GET /`.
    pub redirect_url: String,
    /// Lifetime of an operator session.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            redirect_url: "https://mooncaker.app".into(),
            session_ttl: Duration::from_secs(12 * 3600),
        }
    }
}

/// Operator account of the admin console.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$...`.
    pub password_hash: String,
}

impl AdminConfig {
    /// Rules:
    /// - `username` is not blank;
    /// - `password_hash` is a parseable PHC string.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::InvalidRequest("admin.username is empty".into()));
        }
        PasswordHash::new(&self.password_hash)
            .map_err(|e| ApiError::InvalidRequest(format!("admin.password_hash: {e}")))?;
        Ok(())
    }
}
