use crate::domain::model::{GraphEdge, TradeEvent, WalletGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.7;

/// Builds and analyzes co-trading wallet graphs.
#[derive(Debug, Clone)]
pub struct GraphModule {
    threshold: f64,
}

impl Default for GraphModule {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_THRESHOLD)
    }
}

impl GraphModule {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 同市場內每一對交易計算協同權重，超過門檻者兩個方向都累加
    ///
    /// Two trades by the same wallet produce a self-loop, so a wallet that
    /// trades in tight bursts still shows up as its own community.
    pub fn build_wallet_graph(&self, trades: &[TradeEvent]) -> WalletGraph {
        let mut market_order: Vec<&str> = Vec::new();
        let mut by_market: HashMap<&str, Vec<&TradeEvent>> = HashMap::new();
        for trade in trades {
            by_market
                .entry(trade.market_id.as_str())
                .or_insert_with(|| {
                    market_order.push(trade.market_id.as_str());
                    Vec::new()
                })
                .push(trade);
        }

        let mut adjacency: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for market_id in market_order {
            let market_trades = &by_market[market_id];
            for (i, a) in market_trades.iter().enumerate() {
                for b in &market_trades[i + 1..] {
                    let weight = co_trading_weight(a, b);
                    if weight >= self.threshold {
                        *adjacency
                            .entry(a.account_id.clone())
                            .or_default()
                            .entry(b.account_id.clone())
                            .or_default() += weight;
                        *adjacency
                            .entry(b.account_id.clone())
                            .or_default()
                            .entry(a.account_id.clone())
                            .or_default() += weight;
                    }
                }
            }
        }

        adjacency
            .into_iter()
            .map(|(node, edges)| {
                let edges = edges
                    .into_iter()
                    .map(|(target, weight)| GraphEdge {
                        source: node.clone(),
                        target,
                        weight,
                    })
                    .collect();
                (node, edges)
            })
            .collect()
    }

    /// Connected components, used as a proxy for coordinated communities.
    pub fn detect_communities(&self, graph: &WalletGraph) -> Vec<BTreeSet<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut communities = Vec::new();

        for node in graph.keys() {
            if !visited.insert(node.as_str()) {
                continue;
            }
            let mut community = BTreeSet::new();
            let mut queue = VecDeque::from([node.as_str()]);
            while let Some(current) = queue.pop_front() {
                community.insert(current.to_string());
                for edge in graph.get(current).map(Vec::as_slice).unwrap_or_default() {
                    if visited.insert(edge.target.as_str()) {
                        queue.push_back(edge.target.as_str());
                    }
                }
            }
            communities.push(community);
        }

        tracing::debug!("Detected {} wallet communities", communities.len());
        communities
    }
}

fn co_trading_weight(a: &TradeEvent, b: &TradeEvent) -> f64 {
    let same_direction = if a.outcome == b.outcome { 1.0 } else { 0.5 };
    let size_similarity = 1.0 - (a.size - b.size).abs() / a.size.max(b.size).max(1.0);
    let time_gap = (a.timestamp - b.timestamp).num_milliseconds().abs() as f64 / 1000.0 + 1.0;
    same_direction * size_similarity / time_gap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::trade;

    #[test]
    fn test_simultaneous_identical_trades_are_linked() {
        let module = GraphModule::default();
        let graph = module.build_wallet_graph(&[
            trade("t1", "alice", "m1", 0, "yes", 100.0, 0.4),
            trade("t2", "bob", "m1", 0, "yes", 100.0, 0.4),
        ]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph["alice"][0].target, "bob");
        assert_eq!(graph["alice"][0].weight, 1.0);
        assert_eq!(graph["bob"][0].target, "alice");
        assert_eq!(graph["bob"][0].weight, 1.0);
    }

    #[test]
    fn test_distant_or_opposite_trades_fall_below_threshold() {
        let module = GraphModule::default();
        let graph = module.build_wallet_graph(&[
            trade("t1", "alice", "m1", 0, "yes", 100.0, 0.4),
            // 相隔 10 秒：權重 1/11
            trade("t2", "bob", "m1", 10, "yes", 100.0, 0.4),
            // 反方向：權重 0.5
            trade("t3", "carol", "m1", 0, "no", 100.0, 0.4),
            // 不同市場
            trade("t4", "dave", "m2", 0, "yes", 100.0, 0.4),
        ]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_weights_accumulate_with_self_loops() {
        let module = GraphModule::new(0.5);
        let graph = module.build_wallet_graph(&[
            trade("t1", "alice", "m1", 0, "yes", 10.0, 0.4),
            trade("t2", "alice", "m1", 0, "yes", 10.0, 0.4),
            trade("t3", "bob", "m1", 0, "yes", 10.0, 0.4),
        ]);

        // alice -> alice 兩個方向都累加到同一條邊
        let targets: Vec<(&str, f64)> = graph["alice"]
            .iter()
            .map(|e| (e.target.as_str(), e.weight))
            .collect();
        assert_eq!(targets, vec![("alice", 2.0), ("bob", 2.0)]);
        assert_eq!(graph["bob"].len(), 1);
        assert_eq!(graph["bob"][0].weight, 2.0);
    }

    #[test]
    fn test_lone_wallet_burst_is_its_own_community() {
        let module = GraphModule::default();
        let graph = module.build_wallet_graph(&[
            trade("t1", "solo", "m1", 0, "yes", 10.0, 0.4),
            trade("t2", "solo", "m1", 0, "yes", 10.0, 0.4),
        ]);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph["solo"][0].target, "solo");
        let communities = module.detect_communities(&graph);
        assert_eq!(communities.len(), 1);
        assert!(communities[0].contains("solo"));
    }

    #[test]
    fn test_communities_partition_nodes() {
        let module = GraphModule::default();
        let graph = module.build_wallet_graph(&[
            trade("t1", "a", "m1", 0, "yes", 5.0, 0.4),
            trade("t2", "b", "m1", 0, "yes", 5.0, 0.4),
            trade("t3", "b", "m2", 100, "no", 5.0, 0.4),
            trade("t4", "c", "m2", 100, "no", 5.0, 0.4),
            trade("t5", "x", "m3", 0, "yes", 1.0, 0.4),
            trade("t6", "y", "m3", 0, "yes", 1.0, 0.4),
        ]);

        let communities = module.detect_communities(&graph);
        assert_eq!(communities.len(), 2);

        let first: Vec<&str> = communities[0].iter().map(String::as_str).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        let total: usize = communities.iter().map(BTreeSet::len).sum();
        assert_eq!(total, graph.len());
    }
}
