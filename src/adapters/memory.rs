use crate::domain::model::{MarketResolution, TradeEvent};
use crate::domain::ports::{ResolutionStreamSource, TradeStreamSource};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Fixed set of trades and resolutions, for tests and replaying snapshots.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    trades: Vec<TradeEvent>,
    resolutions: Vec<MarketResolution>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_trades(mut self, trades: Vec<TradeEvent>) -> Self {
        self.trades = trades;
        self
    }

    pub fn with_resolutions(mut self, resolutions: Vec<MarketResolution>) -> Self {
        self.resolutions = resolutions;
        self
    }
}

#[async_trait]
impl TradeStreamSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_trades(&self) -> Result<Vec<TradeEvent>> {
        Ok(self.trades.clone())
    }
}

#[async_trait]
impl ResolutionStreamSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_resolutions(&self) -> Result<Vec<MarketResolution>> {
        Ok(self.resolutions.clone())
    }
}
