use crate::domain::model::{Alert, FeatureMap, FeatureVector, MarketResolution, TradeEvent};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 報表輸出相關設定
pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn report_filename(&self) -> &str;
    fn compress_output(&self) -> bool;
}

#[async_trait]
pub trait TradeStreamSource: Send + Sync {
    fn name(&self) -> &str;
    async fn stream_trades(&self) -> Result<Vec<TradeEvent>>;
}

#[async_trait]
pub trait ResolutionStreamSource: Send + Sync {
    fn name(&self) -> &str;
    async fn stream_resolutions(&self) -> Result<Vec<MarketResolution>>;
}

pub trait PredictiveModel: Send + Sync {
    fn name(&self) -> &str;
    fn predict_proba(&self, features: &FeatureMap) -> f64;
}

pub trait AnomalyDetector: Send + Sync {
    fn name(&self) -> &str;

    /// 以整批特徵重新估計基準；無狀態的偵測器不需要實作
    fn fit(&mut self, _vectors: &[FeatureVector]) {}

    fn score(&self, features: &FeatureMap) -> f64;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, alerts: &[Alert]) -> Result<()>;
}
