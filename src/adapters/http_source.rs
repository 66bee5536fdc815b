use crate::adapters::formats::{parse_json_resolutions, parse_json_trades, SourceFormat};
use crate::domain::model::{MarketResolution, TradeEvent};
use crate::domain::ports::{ResolutionStreamSource, TradeStreamSource};
use crate::utils::error::{DetectionError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Polls an HTTP endpoint that returns a JSON array of trades or resolutions.
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    endpoint: String,
    format: SourceFormat,
    headers: HashMap<String, String>,
    retry_attempts: u32,
    retry_delay: Duration,
    client: Client,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(name, endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn with_timeout(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            format: SourceFormat::Canonical,
            headers: HashMap::new(),
            retry_attempts: 0,
            retry_delay: Duration::from_secs(1),
            client,
        })
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_attempts && e.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(
                        "⚠️ Source '{}' failed ({}), retry {}/{}",
                        self.name,
                        e,
                        attempt,
                        self.retry_attempts
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<u8>> {
        tracing::debug!("Making request to: {}", self.endpoint);
        let mut request = self.client.get(&self.endpoint);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);
        if !status.is_success() {
            return Err(DetectionError::SourceError {
                source_name: self.name.clone(),
                message: format!("{} returned {}", self.endpoint, status),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TradeStreamSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_trades(&self) -> Result<Vec<TradeEvent>> {
        let body = self.fetch().await?;
        parse_json_trades(&self.name, &body, self.format)
    }
}

#[async_trait]
impl ResolutionStreamSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_resolutions(&self) -> Result<Vec<MarketResolution>> {
        let body = self.fetch().await?;
        parse_json_resolutions(&body)
    }
}
