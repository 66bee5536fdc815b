pub mod alerts;
pub mod anomaly;
pub mod engine;
pub mod ensemble;
pub mod evaluation;
pub mod explainability;
pub mod feature_store;
pub mod graph;
pub mod ingestion;
pub mod model_zoo;
pub mod models;
pub mod pipeline;
pub mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::*;
pub use crate::domain::ports::{
    AlertSink, AnomalyDetector, ConfigProvider, PredictiveModel, ResolutionStreamSource, Storage,
    TradeStreamSource,
};
pub use crate::utils::error::Result;
