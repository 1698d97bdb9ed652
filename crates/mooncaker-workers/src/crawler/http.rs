use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use mooncaker_model::ApiKey;
use reqwest::{Client, StatusCode};
use tracing::{debug, trace};

use super::{CrawlError, CrawlJob, CrawlReport, CrawlerConfig};

/// [`CrawlJob`] that fetches one url with the key passed as a query parameter.
pub struct HttpCrawlJob {
    client: Client,
    url: String,
    key_param: String,
    rejection_marker: Option<String>,
    output: Option<PathBuf>,
}

impl HttpCrawlJob {
    pub fn new(url: impl Into<String>, key_param: impl Into<String>) -> Result<Self, CrawlError> {
        Self::with_timeout(url, key_param, Duration::from_secs(30))
    }

    pub fn with_timeout(
        url: impl Into<String>,
        key_param: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            key_param: key_param.into(),
            rejection_marker: None,
            output: None,
        })
    }

    pub fn from_config(cfg: &CrawlerConfig) -> Result<Self, CrawlError> {
        cfg.validate()?;
        Ok(Self::with_timeout(&cfg.url, &cfg.key_param, cfg.request_timeout)?
            .with_rejection_marker(cfg.rejection_marker.clone())
            .with_output(cfg.output.clone()))
    }

    /// Treat a successful body containing `marker` as a rejected key.
    pub fn with_rejection_marker(mut self, marker: Option<String>) -> Self {
        self.rejection_marker = marker.filter(|m| !m.is_empty());
        self
    }

    /// Write each successful body to `path`.
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }
}

#[async_trait]
impl CrawlJob for HttpCrawlJob {
    async fn crawl(&self, key: &ApiKey) -> Result<CrawlReport, CrawlError> {
        trace!(url = %self.url, key = %key, "crawl request");

        // The url carries the key: strip it from transport errors.
        let resp = self
            .client
            .get(&self.url)
            .query(&[(self.key_param.as_str(), key.expose())])
            .send()
            .await
            .map_err(|e| CrawlError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(CrawlError::KeyRejected(format!("upstream answered {status}")));
        }
        if !status.is_success() {
            return Err(CrawlError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| CrawlError::Request(e.without_url().to_string()))?;
        if let Some(marker) = &self.rejection_marker {
            if body.contains(marker.as_str()) {
                return Err(CrawlError::KeyRejected(format!(
                    "response contains rejection marker '{marker}'"
                )));
            }
        }

        if let Some(path) = &self.output {
            tokio::fs::write(path, body.as_bytes())
                .await
                .map_err(|e| CrawlError::Io(format!("{}: {e}", path.display())))?;
        }
        debug!(status = status.as_u16(), bytes = body.len(), "crawl finished");

        Ok(CrawlReport {
            status: status.as_u16(),
            bytes: body.len(),
            output: self.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn key(s: &str) -> ApiKey {
        ApiKey::new(s).unwrap()
    }

    #[tokio::test]
    async fn passes_key_as_query_param_and_saves_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("token", "AB12"))
            .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("data.json");
        let job = HttpCrawlJob::new(format!("{}/data", server.uri()), "token")
            .unwrap()
            .with_output(Some(out.clone()));

        let report = job.crawl(&key("AB12")).await.unwrap();

        assert_eq!(report.status, 200);
        assert_eq!(report.bytes, 7);
        assert_eq!(std::fs::read_to_string(out).unwrap(), "payload");
    }

    #[tokio::test]
    async fn unauthorized_means_rejected_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let job = HttpCrawlJob::new(server.uri(), "key").unwrap();
        let err = job.crawl(&key("old")).await.unwrap_err();

        assert!(err.is_key_rejected());
    }

    #[tokio::test]
    async fn forbidden_means_rejected_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let job = HttpCrawlJob::new(server.uri(), "key").unwrap();
        assert!(job.crawl(&key("old")).await.unwrap_err().is_key_rejected());
    }

    #[tokio::test]
    async fn rejection_marker_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"error": "API key expired"}"#),
            )
            .mount(&server)
            .await;

        let job = HttpCrawlJob::new(server.uri(), "key")
            .unwrap()
            .with_rejection_marker(Some("key expired".into()));

        assert!(job.crawl(&key("old")).await.unwrap_err().is_key_rejected());
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let job = HttpCrawlJob::new(server.uri(), "key").unwrap();
        assert_eq!(job.crawl(&key("k")).await.unwrap_err(), CrawlError::Status(503));
    }

    #[tokio::test]
    async fn transport_error_hides_key() {
        let job =
            HttpCrawlJob::with_timeout("http://127.0.0.1:1/data", "key", Duration::from_secs(2))
                .unwrap();

        match job.crawl(&key("SECRETKEY")).await.unwrap_err() {
            CrawlError::Request(msg) => assert!(!msg.contains("SECRETKEY")),
            other => panic!("expected request error, got {other:?}"),
        }
    }
}
