use crate::domain::model::{MarketResolution, TradeEvent};
use crate::utils::error::{DetectionError, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// 來源資料的欄位格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Field names match `TradeEvent` / `MarketResolution`.
    #[default]
    Canonical,
    /// Polymarket data-API trade records.
    Polymarket,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolymarketTrade {
    proxy_wallet: String,
    condition_id: String,
    outcome: String,
    size: f64,
    price: f64,
    timestamp: i64,
    transaction_hash: String,
}

impl PolymarketTrade {
    fn into_trade(self, source_name: &str) -> Result<TradeEvent> {
        let timestamp = DateTime::from_timestamp(self.timestamp, 0).ok_or_else(|| {
            DetectionError::SourceError {
                source_name: source_name.to_string(),
                message: format!("Timestamp {} is out of range", self.timestamp),
            }
        })?;
        Ok(TradeEvent {
            trade_id: self.transaction_hash,
            account_id: self.proxy_wallet,
            market_id: self.condition_id,
            timestamp,
            outcome: self.outcome,
            size: self.size,
            price: self.price,
        })
    }
}

pub fn parse_json_trades(
    source_name: &str,
    body: &[u8],
    format: SourceFormat,
) -> Result<Vec<TradeEvent>> {
    match format {
        SourceFormat::Canonical => Ok(serde_json::from_slice(body)?),
        SourceFormat::Polymarket => {
            let records: Vec<PolymarketTrade> = serde_json::from_slice(body)?;
            records
                .into_iter()
                .map(|record| record.into_trade(source_name))
                .collect()
        }
    }
}

pub fn parse_json_resolutions(body: &[u8]) -> Result<Vec<MarketResolution>> {
    Ok(serde_json::from_slice(body)?)
}

pub fn parse_csv_trades(body: &[u8]) -> Result<Vec<TradeEvent>> {
    let mut reader = csv::Reader::from_reader(body);
    reader
        .deserialize::<TradeEvent>()
        .map(|row| row.map_err(DetectionError::from))
        .collect()
}

pub fn parse_csv_resolutions(body: &[u8]) -> Result<Vec<MarketResolution>> {
    let mut reader = csv::Reader::from_reader(body);
    reader
        .deserialize::<MarketResolution>()
        .map(|row| row.map_err(DetectionError::from))
        .collect()
}
