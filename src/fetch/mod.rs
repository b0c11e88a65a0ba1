// src/fetch/mod.rs

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::PipelineError;

const USER_AGENT: &str = concat!("filmscraper/", env!("CARGO_PKG_VERSION"));
/// Ceiling for a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`, capped.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Anything that can hand the pipeline an HTML document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self) -> Result<String, PipelineError>;

    /// Where the document comes from, for logs.
    fn describe(&self) -> String;
}

/// Fetches the document over HTTP on every call.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
    max_retries: u32,
    backoff: Duration,
}

impl HttpSource {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }

    /// Builds the client with the configured timeout.
    pub fn from_config(cfg: &Config) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(cfg.fetch_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| PipelineError::Fetch {
                url: cfg.source_url.to_string(),
                source,
            })?;
        Ok(Self::new(client, cfg.source_url.clone()).with_retries(cfg.fetch_max_retries, cfg.fetch_backoff))
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn get_text_core(&self) -> Result<String, reqwest::Error> {
        debug!("Fetching text from {}", self.url);
        self.client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    #[instrument(level = "info", skip(self), fields(url = %self.url))]
    async fn fetch_document(&self) -> Result<String, PipelineError> {
        let mut attempts = 0;
        loop {
            match self.get_text_core().await {
                Ok(text) => {
                    debug!(bytes = text.len(), "fetched document");
                    return Ok(text);
                }
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let delay = backoff_delay(self.backoff, attempts);
                    warn!(attempt = attempts, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(attempts = attempts + 1, error = %e, "fetch failed");
                    return Err(PipelineError::Fetch {
                        url: self.url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Serves a fixed document; used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    label: String,
    html: String,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch_document(&self) -> Result<String, PipelineError> {
        Ok(self.html.clone())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
