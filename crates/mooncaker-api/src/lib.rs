//! HTTP admin API: operator login, console commands and user suggestions.
mod auth;
pub use auth::{AdminCredentials, SessionStore, hash_password};

mod config;
pub use config::{AdminConfig, HttpConfig};

mod error;
pub use error::ApiError;

mod handler;
pub use handler::{AdminService, ApiHandler};

mod http;
pub use http::{HttpApi, serve};
