use crate::domain::model::{FeatureMap, FeatureVector, MarketResolution, TradeEvent};
use chrono::Timelike;
use std::collections::HashMap;

pub const AVG_TRADE_SIZE: &str = "avg_trade_size";
pub const PROFIT_PROXY: &str = "profit_proxy";
pub const TIME_TO_RESOLUTION: &str = "time_to_resolution_est";

/// In-memory feature store.
///
/// Keeps every vector it computed, per account, so rolling features carry
/// over between calls.
#[derive(Debug, Default)]
pub struct FeatureStore {
    storage: HashMap<String, Vec<FeatureVector>>,
    resolutions: HashMap<String, MarketResolution>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登記已結算的市場；同一市場後到的結果覆蓋先前的
    pub fn register_resolutions<'a, I>(&mut self, resolutions: I)
    where
        I: IntoIterator<Item = &'a MarketResolution>,
    {
        for resolution in resolutions {
            self.resolutions
                .insert(resolution.market_id.clone(), resolution.clone());
        }
    }

    pub fn compute_features(&mut self, trades: &[TradeEvent]) -> Vec<FeatureVector> {
        let mut computed = Vec::with_capacity(trades.len());
        for trade in trades {
            let mut features = FeatureMap::new();
            features.insert(
                AVG_TRADE_SIZE.to_string(),
                self.rolling_average(&trade.account_id, trade.size),
            );
            features.insert(PROFIT_PROXY.to_string(), self.profit_proxy(trade));
            features.insert(
                TIME_TO_RESOLUTION.to_string(),
                self.time_to_resolution(trade),
            );

            let vector = FeatureVector {
                entity_id: trade.account_id.clone(),
                features,
                as_of: trade.timestamp,
            };
            self.storage
                .entry(trade.account_id.clone())
                .or_default()
                .push(vector.clone());
            computed.push(vector);
        }

        tracing::debug!(
            "Computed {} feature vectors ({} accounts stored)",
            computed.len(),
            self.storage.len()
        );
        computed
    }

    pub fn latest_features(&self, entity_id: &str) -> Option<&FeatureVector> {
        self.storage.get(entity_id).and_then(|vectors| vectors.last())
    }

    pub fn history(&self, entity_id: &str) -> &[FeatureVector] {
        self.storage
            .get(entity_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.storage.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 清空特徵歷史與已登記的結算結果
    pub fn clear(&mut self) {
        self.storage.clear();
        self.resolutions.clear();
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.len()
    }

    // 指數移動平均，權重各半
    fn rolling_average(&self, account_id: &str, new_value: f64) -> f64 {
        match self.latest_features(account_id) {
            None => new_value,
            Some(last) => {
                let previous = last
                    .features
                    .get(AVG_TRADE_SIZE)
                    .copied()
                    .unwrap_or(new_value);
                0.5 * previous + 0.5 * new_value
            }
        }
    }

    fn profit_proxy(&self, trade: &TradeEvent) -> f64 {
        if let Some(resolution) = self.resolutions.get(&trade.market_id) {
            return if trade
                .outcome
                .eq_ignore_ascii_case(&resolution.resolved_outcome)
            {
                1.0 - trade.price
            } else {
                -trade.price
            };
        }

        // 尚未結算：以買入方向近似
        let direction = match trade.outcome.to_lowercase().as_str() {
            "yes" | "win" => 1.0,
            _ => -1.0,
        };
        direction * (1.0 - trade.price)
    }

    fn time_to_resolution(&self, trade: &TradeEvent) -> f64 {
        let seconds = match self.resolutions.get(&trade.market_id) {
            Some(resolution) => {
                (resolution.resolution_time - trade.timestamp).num_milliseconds() as f64 / 1000.0
            }
            None => {
                let ts = trade.timestamp;
                ts.num_seconds_from_midnight() as f64 + ts.nanosecond() as f64 / 1e9
            }
        };
        seconds.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{resolution, trade};

    #[test]
    fn test_rolling_average_is_exponential() {
        let mut store = FeatureStore::new();
        let trades = vec![
            trade("t1", "alice", "m1", 10, "yes", 100.0, 0.5),
            trade("t2", "alice", "m1", 20, "yes", 200.0, 0.5),
            trade("t3", "alice", "m1", 30, "yes", 0.0, 0.5),
        ];

        let vectors = store.compute_features(&trades);
        let averages: Vec<f64> = vectors.iter().map(|v| v.features[AVG_TRADE_SIZE]).collect();
        assert_eq!(averages, vec![100.0, 150.0, 75.0]);
        assert_eq!(store.history("alice").len(), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_history_carries_over_between_calls() {
        let mut store = FeatureStore::new();
        store.compute_features(&[trade("t1", "bob", "m1", 0, "no", 10.0, 0.2)]);
        let vectors = store.compute_features(&[trade("t2", "bob", "m1", 0, "no", 30.0, 0.2)]);

        assert_eq!(vectors[0].features[AVG_TRADE_SIZE], 20.0);
        let latest = store.latest_features("bob").unwrap();
        assert_eq!(latest.features[AVG_TRADE_SIZE], 20.0);
        assert!(store.latest_features("nobody").is_none());
    }

    #[test]
    fn test_profit_proxy_uses_direction_when_unresolved() {
        let mut store = FeatureStore::new();
        let vectors = store.compute_features(&[
            trade("t1", "a", "m1", 0, "YES", 1.0, 0.25),
            trade("t2", "b", "m1", 0, "no", 1.0, 0.25),
        ]);
        assert_eq!(vectors[0].features[PROFIT_PROXY], 0.75);
        assert_eq!(vectors[1].features[PROFIT_PROXY], -0.75);
    }

    #[test]
    fn test_time_to_resolution_defaults_to_seconds_since_midnight() {
        let mut store = FeatureStore::new();
        let vectors = store.compute_features(&[
            trade("t1", "a", "m1", 0, "yes", 1.0, 0.5),
            trade("t2", "a", "m1", 3_600, "yes", 1.0, 0.5),
        ]);
        // 午夜整點時下限為 1 秒
        assert_eq!(vectors[0].features[TIME_TO_RESOLUTION], 1.0);
        assert_eq!(vectors[1].features[TIME_TO_RESOLUTION], 3_600.0);
    }

    #[test]
    fn test_resolved_markets_use_realized_outcome() {
        let mut store = FeatureStore::new();
        store.register_resolutions(&[resolution("m1", 7_200, "Yes")]);

        let vectors = store.compute_features(&[
            trade("t1", "a", "m1", 3_600, "yes", 1.0, 0.3),
            trade("t2", "b", "m1", 3_600, "no", 1.0, 0.3),
            trade("t3", "c", "m2", 60, "no", 1.0, 0.3),
        ]);

        assert!((vectors[0].features[PROFIT_PROXY] - 0.7).abs() < 1e-12);
        assert!((vectors[1].features[PROFIT_PROXY] + 0.3).abs() < 1e-12);
        assert_eq!(vectors[0].features[TIME_TO_RESOLUTION], 3_600.0);
        // m2 尚未結算
        assert!((vectors[2].features[PROFIT_PROXY] + 0.7).abs() < 1e-12);
        assert_eq!(vectors[2].features[TIME_TO_RESOLUTION], 60.0);
    }

    #[test]
    fn test_clear_drops_history_and_resolutions() {
        let mut store = FeatureStore::new();
        store.register_resolutions(&[resolution("m1", 100, "no")]);
        store.compute_features(&[trade("t1", "a", "m1", 0, "yes", 1.0, 0.5)]);
        assert!(!store.is_empty());
        assert_eq!(store.resolution_count(), 1);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.resolution_count(), 0);

        // 清空後回到未結算的方向近似
        let vectors = store.compute_features(&[trade("t2", "a", "m1", 0, "yes", 1.0, 0.4)]);
        assert!((vectors[0].features[PROFIT_PROXY] - 0.6).abs() < 1e-9);
    }
}
