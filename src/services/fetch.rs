// src/services/fetch.rs

//! Content fetching.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{FetchError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::{create_client, pace, request_delay};

/// Retrieves raw bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a shared `reqwest` client.
///
/// Transient failures (timeouts, transport errors, 429 and 5xx) are retried
/// up to `max_attempts` attempts in total, pausing between attempts.
pub struct HttpFetcher {
    client: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config)?,
            max_attempts: config.max_attempts.max(1),
            retry_delay: request_delay(config),
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        with_retries(self.max_attempts, self.retry_delay, || self.fetch_once(url)).await
    }
}

/// Run `attempt` until it succeeds, fails permanently, or `max_attempts` is
/// reached. Returns the last error.
pub async fn with_retries<T, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut attempt: F,
) -> std::result::Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && tries < max_attempts => {
                log::warn!(
                    "Attempt {}/{} failed: {}; retrying",
                    tries,
                    max_attempts,
                    e
                );
                tries += 1;
                pace(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
