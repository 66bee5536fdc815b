use crate::adapters::formats::{
    parse_csv_resolutions, parse_csv_trades, parse_json_resolutions, parse_json_trades,
    SourceFormat,
};
use crate::domain::model::{MarketResolution, TradeEvent};
use crate::domain::ports::{ResolutionStreamSource, TradeStreamSource};
use crate::utils::error::{DetectionError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
}

/// Reads trades or resolutions from a local CSV or JSON file on every poll.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    kind: FileKind,
    format: SourceFormat,
}

impl FileSource {
    pub fn csv(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: FileKind::Csv,
            format: SourceFormat::Canonical,
        }
    }

    pub fn json(name: impl Into<String>, path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: FileKind::Json,
            format,
        }
    }

    async fn read(&self) -> Result<Vec<u8>> {
        tracing::debug!("Reading source '{}' from {}", self.name, self.path.display());
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| DetectionError::SourceError {
                source_name: self.name.clone(),
                message: format!("cannot read {}: {}", self.path.display(), e),
            })
    }
}

#[async_trait]
impl TradeStreamSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_trades(&self) -> Result<Vec<TradeEvent>> {
        let body = self.read().await?;
        match self.kind {
            FileKind::Csv => parse_csv_trades(&body),
            FileKind::Json => parse_json_trades(&self.name, &body, self.format),
        }
    }
}

#[async_trait]
impl ResolutionStreamSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_resolutions(&self) -> Result<Vec<MarketResolution>> {
        let body = self.read().await?;
        match self.kind {
            FileKind::Csv => parse_csv_resolutions(&body),
            FileKind::Json => parse_json_resolutions(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_csv_trades_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "trade_id,account_id,market_id,timestamp,outcome,size,price").unwrap();
        writeln!(file, "t1,alice,m1,2024-03-01T10:00:00Z,yes,25,0.35").unwrap();
        writeln!(file, "t2,bob,m1,2024-03-01T10:00:05Z,no,5,0.65").unwrap();

        let source = FileSource::csv("trades", file.path());
        let trades = source.stream_trades().await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].outcome, "no");
    }

    #[tokio::test]
    async fn test_json_resolutions_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"market_id":"m1","resolution_time":"2024-03-05T00:00:00Z","resolved_outcome":"yes"}}]"#
        )
        .unwrap();

        let source = FileSource::json("res", file.path(), SourceFormat::Canonical);
        let resolutions = source.stream_resolutions().await.unwrap();
        assert_eq!(resolutions[0].market_id, "m1");
    }

    #[tokio::test]
    async fn test_missing_file_names_the_source() {
        let source = FileSource::csv("ghost", "/definitely/not/here.csv");
        let err = source.stream_trades().await.unwrap_err();
        assert!(matches!(err, DetectionError::SourceError { ref source_name, .. } if source_name == "ghost"));
    }
}
