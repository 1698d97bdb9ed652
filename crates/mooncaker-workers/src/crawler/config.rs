use std::{path::PathBuf, time::Duration};

use mooncaker_model::ApiKey;
use serde::{Deserialize, Serialize};

use super::CrawlError;

/// Crawler worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub enabled: bool,
    /// Upstream endpoint fetched on every pass.
    pub url: String,
    /// Query parameter carrying the api key.
    pub key_param: String,
    /// Key used until the first rejection.
    pub initial_key: Option<ApiKey>,
    /// Pause between passes.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Give up waiting for a replacement key after this long; unset waits forever.
    #[serde(with = "humantime_serde")]
    pub key_wait_timeout: Option<Duration>,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Body substring that marks a rejected key on a `200` response.
    pub rejection_marker: Option<String>,
    /// Where the last response body is written.
    pub output: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            key_param: "key".into(),
            initial_key: None,
            interval: Duration::from_secs(3600),
            key_wait_timeout: None,
            request_timeout: Duration::from_secs(30),
            rejection_marker: None,
            output: None,
        }
    }
}

impl CrawlerConfig {
    /// Rules (only checked when enabled):
    /// - `url` is an absolute http(s) url;
    /// - `key_param` is not blank;
    /// - `interval` and `request_timeout` are non-zero.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if !self.enabled {
            return Ok(());
        }
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| CrawlError::InvalidConfig(format!("crawler.url '{}': {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidConfig(format!(
                "crawler.url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.key_param.trim().is_empty() {
            return Err(CrawlError::InvalidConfig("crawler.key_param is empty".into()));
        }
        if self.interval.is_zero() || self.request_timeout.is_zero() {
            return Err(CrawlError::InvalidConfig(
                "crawler.interval and crawler.request_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(url: &str) -> CrawlerConfig {
        CrawlerConfig {
            enabled: true,
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn disabled_config_is_not_checked() {
        assert!(CrawlerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(enabled("ftp://example.com/data").validate().is_err());
        assert!(enabled("not a url").validate().is_err());
        assert!(enabled("https://example.com/data").validate().is_ok());
    }

    #[test]
    fn rejects_blank_key_param() {
        let cfg = CrawlerConfig {
            key_param: " ".into(),
            ..enabled("https://example.com")
        };
        assert!(matches!(cfg.validate(), Err(CrawlError::InvalidConfig(_))));
    }

    #[test]
    fn parses_human_durations() {
        let cfg: CrawlerConfig = serde_json::from_str(
            r#"{
                "enabled": true,
                "url": "https://example.com",
                "interval": "15m",
                "key_wait_timeout": "2h",
                "initial_key": "AB12"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.interval, Duration::from_secs(900));
        assert_eq!(cfg.key_wait_timeout, Some(Duration::from_secs(7200)));
        assert_eq!(cfg.initial_key.unwrap().expose(), "AB12");
        assert_eq!(cfg.key_param, "key");
    }

    #[test]
    fn empty_initial_key_is_rejected() {
        let res = serde_json::from_str::<CrawlerConfig>(r#"{"initial_key": ""}"#);
        assert!(res.is_err());
    }
}
