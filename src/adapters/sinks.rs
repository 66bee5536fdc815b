use crate::domain::model::{Alert, Severity};
use crate::domain::ports::AlertSink;
use crate::utils::error::{DetectionError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl AlertSink for TracingSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<()> {
        for alert in alerts {
            match alert.severity {
                Severity::Critical => tracing::error!("🚨 {}", alert.message),
                Severity::High => tracing::warn!("⚠️ {}", alert.message),
                _ => tracing::info!("🔔 {}", alert.message),
            }
        }
        Ok(())
    }
}

/// Appends one JSON object per alert to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AlertSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<()> {
        let mut buffer = Vec::new();
        for alert in alerts {
            serde_json::to_writer(&mut buffer, alert)?;
            buffer.push(b'\n');
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

/// POSTs the alert batch as a JSON array.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    client: Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alerts: &[Alert]) -> Result<()> {
        let response = self.client.post(&self.url).json(alerts).send().await?;
        if !response.status().is_success() {
            return Err(DetectionError::SinkError {
                sink_name: self.name().to_string(),
                message: format!("{} returned {}", self.url, response.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn alert(entity: &str) -> Alert {
        Alert {
            entity_id: entity.to_string(),
            score: 0.8,
            severity: Severity::High,
            message: format!("Account {} flagged with severity high (score=0.80).", entity),
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts/alerts.jsonl");
        let sink = JsonLinesSink::new(&path);

        sink.send(&[alert("a")]).await.unwrap();
        sink.send(&[alert("b"), alert("c")]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: Alert = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed.entity_id, "c");
        assert!(lines[0].contains("\"severity\":\"high\""));
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        tokio_test::assert_ok!(TracingSink.send(&[alert("a")]).await);
    }
}
