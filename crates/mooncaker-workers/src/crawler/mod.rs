//! Crawler worker: runs a [`CrawlJob`] on an interval and refreshes the key on rejection.
mod config;
pub use config::CrawlerConfig;

mod http;
pub use http::HttpCrawlJob;

mod task;
pub use task::crawler_task;

use std::path::PathBuf;

use async_trait::async_trait;
use mooncaker_model::ApiKey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// The upstream refused the key; only a new key helps.
    #[error("api key rejected: {0}")]
    KeyRejected(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected upstream status {0}")]
    Status(u16),

    #[error("failed to store crawl output: {0}")]
    Io(String),

    #[error("invalid crawler configuration: {0}")]
    InvalidConfig(String),
}

impl CrawlError {
    pub fn is_key_rejected(&self) -> bool {
        matches!(self, CrawlError::KeyRejected(_))
    }
}

/// Outcome of one successful crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub status: u16,
    pub bytes: usize,
    pub output: Option<PathBuf>,
}

/// One crawl pass authenticated with an api key.
#[async_trait]
pub trait CrawlJob: Send + Sync + 'static {
    async fn crawl(&self, key: &ApiKey) -> Result<CrawlReport, CrawlError>;
}
