//! HTTP fetch collaborator with bounded retries

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use lm_compiler::Fetcher;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub attempts: u32,
    /// Wait before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Fetches `http(s)://` sources with reqwest and `file://` sources from disk.
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("listmerge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, retry })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(tokio::fs::read_to_string(path).await?);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(body) => {
                    log::debug!("Fetched {} ({} bytes)", url, body.len());
                    return Some(body);
                }
                Err(e) => {
                    log::warn!("Fetching {url} failed (attempt {attempt}/{attempts}): {e}");
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.backoff * attempt).await;
                    }
                }
            }
        }

        log::error!("Giving up on {url} after {attempts} attempts");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        let retry = RetryPolicy {
            attempts: 2,
            backoff: Duration::from_millis(1),
        };
        HttpFetcher::new(Duration::from_secs(5), retry).unwrap()
    }

    #[tokio::test]
    async fn reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "||ads.example.com^\n").unwrap();

        let body = fetcher().fetch(&format!("file://{}", path.display())).await;
        assert_eq!(body.as_deref(), Some("||ads.example.com^\n"));
    }

    #[tokio::test]
    async fn exhausted_retries_yield_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");

        let body = fetcher().fetch(&format!("file://{}", missing.display())).await;
        assert_eq!(body, None);
    }
}
