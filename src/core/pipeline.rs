use crate::core::alerts::{AlertDispatcher, DispatchSummary};
use crate::core::anomaly::AnomalyModule;
use crate::core::ensemble::EnsembleCombiner;
use crate::core::explainability::ExplainabilityModule;
use crate::core::feature_store::FeatureStore;
use crate::core::graph::GraphModule;
use crate::core::ingestion::DataIngestion;
use crate::core::model_zoo::ModelZoo;
use crate::core::sequence::SequenceModule;
use crate::domain::model::{
    Alert, AnomalyScore, BacktestMetrics, EnsembleScore, Explanation, FeatureVector,
    MarketResolution, ModelPrediction, TradeEvent,
};
use crate::utils::error::Result;
use std::collections::{HashMap, HashSet};

pub const COMMUNITIES_DETECTED: &str = "communities_detected";
pub const AVG_ANOMALY_SCORE: &str = "avg_anomaly_score";

/// Coordinates end-to-end inference, scoring, and alerting.
pub struct InsiderDetectionPipeline {
    ingestion: DataIngestion,
    feature_store: FeatureStore,
    model_zoo: ModelZoo,
    ensemble: EnsembleCombiner,
    alert_dispatcher: AlertDispatcher,
    sequence_module: Option<SequenceModule>,
    graph_module: Option<GraphModule>,
    anomaly_module: Option<AnomalyModule>,
    explainability: Option<ExplainabilityModule>,
    markets_of_interest: Option<HashSet<String>>,
    alerts: Vec<Alert>,
    explanations: Vec<Explanation>,
    anomaly_scores: Vec<AnomalyScore>,
    last_dispatch: DispatchSummary,
}

impl InsiderDetectionPipeline {
    pub fn new(
        ingestion: DataIngestion,
        model_zoo: ModelZoo,
        ensemble: EnsembleCombiner,
        alert_dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            ingestion,
            feature_store: FeatureStore::new(),
            model_zoo,
            ensemble,
            alert_dispatcher,
            sequence_module: None,
            graph_module: None,
            anomaly_module: None,
            explainability: None,
            markets_of_interest: None,
            alerts: Vec::new(),
            explanations: Vec::new(),
            anomaly_scores: Vec::new(),
            last_dispatch: DispatchSummary::default(),
        }
    }

    pub fn with_feature_store(mut self, feature_store: FeatureStore) -> Self {
        self.feature_store = feature_store;
        self
    }

    pub fn with_sequence_module(mut self, module: SequenceModule) -> Self {
        self.sequence_module = Some(module);
        self
    }

    pub fn with_graph_module(mut self, module: GraphModule) -> Self {
        self.graph_module = Some(module);
        self
    }

    pub fn with_anomaly_module(mut self, module: AnomalyModule) -> Self {
        self.anomaly_module = Some(module);
        self
    }

    pub fn with_explainability(mut self, module: ExplainabilityModule) -> Self {
        self.explainability = Some(module);
        self
    }

    pub fn with_markets_of_interest<I, S>(mut self, markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markets_of_interest = Some(markets.into_iter().map(Into::into).collect());
        self
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn explanations(&self) -> &[Explanation] {
        &self.explanations
    }

    pub fn anomaly_scores(&self) -> &[AnomalyScore] {
        &self.anomaly_scores
    }

    pub fn last_dispatch(&self) -> DispatchSummary {
        self.last_dispatch
    }

    pub fn feature_store(&self) -> &FeatureStore {
        &self.feature_store
    }

    pub fn alert_dispatcher(&self) -> &AlertDispatcher {
        &self.alert_dispatcher
    }

    pub fn model_zoo(&self) -> &ModelZoo {
        &self.model_zoo
    }

    /// Execute inference across configured models and produce alerts.
    pub async fn run_inference(&mut self) -> Result<Vec<Alert>> {
        let trades = self.load_trade_events().await?;
        let resolved = self.load_resolutions().await?;
        tracing::info!(
            "📥 Loaded {} trades and {} resolutions",
            trades.len(),
            resolved
        );

        let vectors = self.compute_vectors(&trades);
        let predictions = self.generate_predictions(&vectors);
        self.anomaly_scores = self.run_anomaly_detectors(&vectors);

        let combined = self.ensemble.combine(&predictions);
        tracing::info!(
            "🧮 Scored {} accounts with {} models",
            combined.len(),
            self.model_zoo.len()
        );
        self.explanations = self.build_explanations(&vectors, &combined);

        self.alerts = self.alert_dispatcher.create_alerts(&combined);
        self.last_dispatch = self.alert_dispatcher.dispatch(&self.alerts).await;
        tracing::info!("🚨 Raised {} alerts", self.alerts.len());

        Ok(self.alerts.clone())
    }

    /// 從結算來源載入市場結果並登記到 feature store，回傳筆數
    pub async fn load_resolutions(&mut self) -> Result<usize> {
        let resolutions = self.ingestion.get_recent_resolutions().await?;
        self.register_resolutions(&resolutions);
        Ok(resolutions.len())
    }

    pub fn register_resolutions(&mut self, resolutions: &[MarketResolution]) {
        self.feature_store.register_resolutions(resolutions);
    }

    /// Run the ensemble on historical data to compute diagnostics.
    ///
    /// Resolutions must be registered beforehand (see `load_resolutions`)
    /// for the realized profit features to apply.
    pub fn run_backtest(&mut self, historical_trades: &[TradeEvent]) -> BacktestMetrics {
        self.run_backtest_scored(historical_trades).0
    }

    /// 與 `run_backtest` 相同，另外回傳每個帳號的 ensemble 分數供評估使用
    pub fn run_backtest_scored(
        &mut self,
        historical_trades: &[TradeEvent],
    ) -> (BacktestMetrics, Vec<EnsembleScore>) {
        let vectors = self.compute_vectors(historical_trades);
        let predictions = self.generate_predictions(&vectors);
        let mut metrics = self.ensemble.aggregate_statistics(&predictions);

        if let Some(graph_module) = &self.graph_module {
            let graph = graph_module.build_wallet_graph(historical_trades);
            let communities = graph_module.detect_communities(&graph);
            metrics.insert(COMMUNITIES_DETECTED.to_string(), communities.len() as f64);
        }

        let anomaly_scores = self.run_anomaly_detectors(&vectors);
        if !anomaly_scores.is_empty() {
            let total: f64 = anomaly_scores.iter().map(|s| s.score).sum();
            metrics.insert(
                AVG_ANOMALY_SCORE.to_string(),
                total / anomaly_scores.len() as f64,
            );
        }

        tracing::info!(
            "📈 Backtest over {} trades produced {} metrics",
            historical_trades.len(),
            metrics.len()
        );
        let scores = self.ensemble.combine(&predictions);
        (metrics, scores)
    }

    /// 只計算 ensemble 分數，不產生警示
    pub fn score_trades(&mut self, trades: &[TradeEvent]) -> Vec<EnsembleScore> {
        let vectors = self.compute_vectors(trades);
        let predictions = self.generate_predictions(&vectors);
        self.ensemble.combine(&predictions)
    }

    async fn load_trade_events(&self) -> Result<Vec<TradeEvent>> {
        let trades = self.ingestion.get_recent_trades().await?;
        Ok(match &self.markets_of_interest {
            None => trades,
            Some(markets) => trades
                .into_iter()
                .filter(|trade| markets.contains(&trade.market_id))
                .collect(),
        })
    }

    fn compute_vectors(&mut self, trades: &[TradeEvent]) -> Vec<FeatureVector> {
        let vectors = self.feature_store.compute_features(trades);
        match &self.sequence_module {
            None => vectors,
            Some(module) => {
                let embeddings = module.encode(trades);
                module.enrich_features(vectors, &embeddings)
            }
        }
    }

    fn generate_predictions(&self, vectors: &[FeatureVector]) -> Vec<ModelPrediction> {
        vectors
            .iter()
            .flat_map(|vector| self.model_zoo.iter_models().map(move |m| m.predict(vector)))
            .collect()
    }

    fn run_anomaly_detectors(&mut self, vectors: &[FeatureVector]) -> Vec<AnomalyScore> {
        match &mut self.anomaly_module {
            None => Vec::new(),
            Some(module) => {
                module.fit(vectors);
                module.run(vectors)
            }
        }
    }

    fn build_explanations(
        &self,
        vectors: &[FeatureVector],
        scores: &[EnsembleScore],
    ) -> Vec<Explanation> {
        let Some(module) = &self.explainability else {
            return Vec::new();
        };
        // 同一帳號以最後一個向量為準
        let lookup: HashMap<&str, &FeatureVector> = vectors
            .iter()
            .map(|vector| (vector.entity_id.as_str(), vector))
            .collect();

        scores
            .iter()
            .filter_map(|score| {
                lookup
                    .get(score.entity_id.as_str())
                    .map(|vector| module.build_explanation(&vector.features, score))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySource;
    use crate::core::anomaly::ZScoreDetector;
    use crate::core::feature_store::{AVG_TRADE_SIZE, PROFIT_PROXY, TIME_TO_RESOLUTION};
    use crate::core::model_zoo::ModelWrapper;
    use crate::core::models::RuleModel;
    use crate::core::testing::{resolution, trade};
    use crate::domain::model::Severity;
    use std::collections::BTreeMap;

    fn rule_model(name: &str, feature: &str, threshold: f64) -> ModelWrapper {
        let mut rules = BTreeMap::new();
        rules.insert(feature.to_string(), threshold);
        ModelWrapper::new(Box::new(RuleModel::new(name, rules)))
    }

    fn sample_trades() -> Vec<TradeEvent> {
        vec![
            trade("t1", "whale", "m1", 10, "yes", 5_000.0, 0.2),
            trade("t2", "minnow", "m1", 12, "no", 10.0, 0.8),
            trade("t3", "whale", "m2", 20, "yes", 4_000.0, 0.3),
            trade("t4", "minnow", "m2", 30, "yes", 20.0, 0.6),
        ]
    }

    fn pipeline(trades: Vec<TradeEvent>) -> InsiderDetectionPipeline {
        let source = MemorySource::new("memory")
            .with_trades(trades)
            .with_resolutions(vec![resolution("m1", 3_600, "yes")]);
        let ingestion = DataIngestion::new(vec![Box::new(source.clone())], vec![Box::new(source)]);
        let zoo = ModelZoo::with_models(vec![
            rule_model("size", AVG_TRADE_SIZE, 1_000.0),
            rule_model("profit", "profit_proxy", 0.5),
        ])
        .unwrap();
        InsiderDetectionPipeline::new(
            ingestion,
            zoo,
            EnsembleCombiner::default(),
            AlertDispatcher::default(),
        )
    }

    #[tokio::test]
    async fn test_run_inference_flags_large_profitable_account() {
        let mut pipeline = pipeline(sample_trades()).with_explainability(ExplainabilityModule::default());
        let alerts = pipeline.run_inference().await.unwrap();

        // whale 最後一筆：size 4500 觸發，m2 未結算 profit 0.7 觸發 -> 1.0
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity_id, "whale");
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(pipeline.alert_dispatcher().sent_alerts().len(), 1);

        let ids: Vec<&str> = pipeline
            .explanations()
            .iter()
            .map(|e| e.entity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["whale", "minnow"]);
        assert!(pipeline.anomaly_scores().is_empty());
    }

    #[tokio::test]
    async fn test_markets_of_interest_filter() {
        let mut pipeline = pipeline(sample_trades()).with_markets_of_interest(["m1"]);
        pipeline.run_inference().await.unwrap();

        assert_eq!(pipeline.feature_store().len(), 2);
        assert!(pipeline.feature_store().history("whale").len() == 1);
    }

    #[tokio::test]
    async fn test_sequence_features_reach_explanations() {
        let mut pipeline = pipeline(sample_trades())
            .with_sequence_module(SequenceModule::new(2))
            .with_anomaly_module(AnomalyModule::new(vec![Box::new(ZScoreDetector::new(
                "z",
                vec![AVG_TRADE_SIZE.to_string()],
            ))]))
            .with_explainability(ExplainabilityModule::new(10));
        pipeline.run_inference().await.unwrap();

        let explanation = &pipeline.explanations()[0];
        assert!(explanation.top_features.iter().any(|f| f == "seq_1"));
        // 4 個向量 × 1 個偵測器
        assert_eq!(pipeline.anomaly_scores().len(), 4);
    }

    #[test]
    fn test_backtest_metrics() {
        let mut pipeline = pipeline(Vec::new())
            .with_graph_module(GraphModule::new(0.0))
            .with_anomaly_module(AnomalyModule::new(vec![Box::new(ZScoreDetector::new(
                "z",
                vec![AVG_TRADE_SIZE.to_string()],
            ))]));

        let metrics = pipeline.run_backtest(&sample_trades());
        assert_eq!(metrics["size"], 0.5);
        assert_eq!(metrics[COMMUNITIES_DETECTED], 1.0);
        assert!(metrics.contains_key(AVG_ANOMALY_SCORE));
        assert!(pipeline.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_backtest_uses_registered_resolutions() {
        let mut pipeline = pipeline(Vec::new());
        assert_eq!(pipeline.load_resolutions().await.unwrap(), 1);
        pipeline.run_backtest(&sample_trades());

        // minnow 在已結算 (yes) 的 m1 買 no @0.8：實現損益 -0.8，距結算 3588 秒
        let minnow = &pipeline.feature_store().history("minnow")[0];
        assert!((minnow.features[PROFIT_PROXY] + 0.8).abs() < 1e-9);
        assert_eq!(minnow.features[TIME_TO_RESOLUTION], 3_588.0);
        // m2 未結算，維持方向近似
        let whale = &pipeline.feature_store().history("whale")[1];
        assert!((whale.features[PROFIT_PROXY] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_backtest_scores_match_accounts() {
        let mut pipeline = pipeline(Vec::new());
        let (metrics, scores) = pipeline.run_backtest_scored(&sample_trades());
        assert_eq!(metrics.len(), 2);
        let ids: Vec<&str> = scores.iter().map(|s| s.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["whale", "minnow"]);
        assert_eq!(scores[0].score, 1.0);
    }

    #[test]
    fn test_score_trades_without_alerting() {
        let mut pipeline = pipeline(Vec::new());
        let scores = pipeline.score_trades(&sample_trades());
        assert_eq!(scores.len(), 2);
        assert!(pipeline.alert_dispatcher().sent_alerts().is_empty());
    }
}
