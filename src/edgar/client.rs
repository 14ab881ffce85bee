// src/edgar/client.rs
use crate::utils::config::Settings;
use crate::utils::error::EdgarError;
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;

/// "Fetch a URL, get its body" capability. Retries and backoff live behind
/// this trait, never in the extraction core.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, EdgarError>;
}

/// reqwest-backed fetcher for the EDGAR archive.
/// Includes the mandatory User-Agent and basic rate limiting.
pub struct EdgarClient {
    client: reqwest::Client,
    request_delay: Duration,
}

impl EdgarClient {
    pub fn new(settings: &Settings) -> Result<Self, EdgarError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str()) // Set the required User-Agent
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            request_delay: settings.request_delay,
        })
    }
}

#[async_trait]
impl Fetch for EdgarClient {
    async fn fetch(&self, url: &str) -> Result<String, EdgarError> {
        tracing::debug!("Downloading {}", url);

        // Fixed delay before every request; the crawler fetches one URL at a time.
        tokio::time::sleep(self.request_delay).await;

        let response = self
            .client
            .get(url)
            .header(
                header::ACCEPT,
                "application/xml,application/atom+xml,text/html,text/plain,*/*",
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN {
                tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
                return Err(EdgarError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::NotFound(url.to_string()));
            }
            return Err(EdgarError::Http(status, url.to_string()));
        }

        let body = response.text().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
