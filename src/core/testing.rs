//! Fixtures shared by the unit tests.

use crate::domain::model::{FeatureMap, FeatureVector, MarketResolution, TradeEvent};
use chrono::{DateTime, TimeZone, Utc};

/// 2024-03-01T00:00:00Z 加上偏移秒數
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

pub fn trade(
    trade_id: &str,
    account_id: &str,
    market_id: &str,
    offset_secs: i64,
    outcome: &str,
    size: f64,
    price: f64,
) -> TradeEvent {
    TradeEvent {
        trade_id: trade_id.to_string(),
        account_id: account_id.to_string(),
        market_id: market_id.to_string(),
        timestamp: at(offset_secs),
        outcome: outcome.to_string(),
        size,
        price,
    }
}

pub fn resolution(market_id: &str, offset_secs: i64, outcome: &str) -> MarketResolution {
    MarketResolution {
        market_id: market_id.to_string(),
        resolution_time: at(offset_secs),
        resolved_outcome: outcome.to_string(),
    }
}

pub fn features(pairs: &[(&str, f64)]) -> FeatureMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

pub fn vector(entity_id: &str, pairs: &[(&str, f64)]) -> FeatureVector {
    FeatureVector {
        entity_id: entity_id.to_string(),
        features: features(pairs),
        as_of: at(0),
    }
}
