//! Operator authentication: argon2 password check and in-memory bearer sessions.
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{AdminConfig, ApiError};

/// Hash a password into an argon2 PHC string suitable for `admin.password_hash`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("hash password: {e}")))
}

/// The single operator account.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn new(cfg: &AdminConfig) -> Result<Self, ApiError> {
        cfg.validate()?;
        Ok(Self {
            username: cfg.username.clone(),
            password_hash: cfg.password_hash.clone(),
        })
    }

    /// Verify a login attempt. Parameters are taken from the stored hash.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Bearer sessions with a fixed time-to-live.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<Uuid, Instant>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open a session and return its token.
    pub fn create(&self) -> Uuid {
        let token = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        sessions.retain(|_, expires| *expires > now);
        sessions.insert(token, now + self.ttl);
        debug!(active = sessions.len(), "operator session opened");
        token
    }

    /// Whether `token` refers to a live session. Expired sessions are dropped.
    pub fn validate(&self, token: &Uuid) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(token) {
            Some(expires) if *expires > Instant::now() => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    /// Close a session. Returns whether it existed.
    pub fn revoke(&self, token: &Uuid) -> bool {
        self.sessions.lock().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
