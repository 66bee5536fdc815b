use crate::domain::model::{MarketResolution, TradeEvent};
use crate::domain::ports::{ResolutionStreamSource, TradeStreamSource};
use crate::utils::error::Result;

/// Coordinates ingestion across multiple sources and adapters.
///
/// Sources are drained one after another in registration order, so the
/// returned events keep the order each source produced them in.
pub struct DataIngestion {
    trade_sources: Vec<Box<dyn TradeStreamSource>>,
    resolution_sources: Vec<Box<dyn ResolutionStreamSource>>,
}

impl DataIngestion {
    pub fn new(
        trade_sources: Vec<Box<dyn TradeStreamSource>>,
        resolution_sources: Vec<Box<dyn ResolutionStreamSource>>,
    ) -> Self {
        Self {
            trade_sources,
            resolution_sources,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn add_trade_source(&mut self, source: Box<dyn TradeStreamSource>) {
        self.trade_sources.push(source);
    }

    pub fn add_resolution_source(&mut self, source: Box<dyn ResolutionStreamSource>) {
        self.resolution_sources.push(source);
    }

    pub fn trade_source_count(&self) -> usize {
        self.trade_sources.len()
    }

    pub fn resolution_source_count(&self) -> usize {
        self.resolution_sources.len()
    }

    pub async fn get_recent_trades(&self) -> Result<Vec<TradeEvent>> {
        let mut trades = Vec::new();
        for source in &self.trade_sources {
            let batch = source.stream_trades().await?;
            tracing::debug!("Source '{}' yielded {} trades", source.name(), batch.len());
            trades.extend(batch);
        }
        Ok(trades)
    }

    pub async fn get_recent_resolutions(&self) -> Result<Vec<MarketResolution>> {
        let mut resolutions = Vec::new();
        for source in &self.resolution_sources {
            let batch = source.stream_resolutions().await?;
            tracing::debug!(
                "Source '{}' yielded {} resolutions",
                source.name(),
                batch.len()
            );
            resolutions.extend(batch);
        }
        Ok(resolutions)
    }

    /// 批次管線使用：一次取出所有交易
    pub async fn snapshot_trades(&self) -> Result<Vec<TradeEvent>> {
        let trades = self.get_recent_trades().await?;
        tracing::info!("📥 Snapshot contains {} trades", trades.len());
        Ok(trades)
    }
}
