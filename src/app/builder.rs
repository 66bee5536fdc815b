use crate::adapters::{
    FileSource, HttpSource, JsonLinesSink, MemorySource, TracingSink, WebhookSink,
};
use crate::config::toml_config::{
    DetectionConfig, DetectorConfig, DetectorKind, ModelConfig, ModelKind, SinkConfig,
    SourceConfig, SourceType,
};
use crate::core::alerts::AlertDispatcher;
use crate::core::anomaly::{AnomalyModule, BoundsDetector, ZScoreDetector};
use crate::core::ensemble::EnsembleCombiner;
use crate::core::explainability::ExplainabilityModule;
use crate::core::graph::GraphModule;
use crate::core::ingestion::DataIngestion;
use crate::core::model_zoo::{ModelWrapper, ModelZoo, Postprocess};
use crate::core::models::{LogisticModel, RuleModel};
use crate::core::pipeline::InsiderDetectionPipeline;
use crate::core::sequence::SequenceModule;
use crate::domain::ports::{AlertSink, AnomalyDetector, ResolutionStreamSource, TradeStreamSource};
use crate::utils::error::{DetectionError, Result};
use std::time::Duration;

/// 依設定組出完整的偵測管線
pub fn build_pipeline(config: &DetectionConfig) -> Result<InsiderDetectionPipeline> {
    let ingestion = build_ingestion(config)?;
    let zoo = build_model_zoo(&config.models)?;
    let ensemble = EnsembleCombiner::new(config.ensemble.weights.clone());
    let dispatcher = build_dispatcher(config);

    let mut pipeline = InsiderDetectionPipeline::new(ingestion, zoo, ensemble, dispatcher);

    if config.sequence.enabled {
        pipeline = pipeline.with_sequence_module(SequenceModule::new(config.sequence.embedding_dim));
    }
    if config.graph.enabled {
        pipeline = pipeline.with_graph_module(GraphModule::new(config.graph.threshold));
    }
    if !config.detectors.is_empty() {
        let detectors = config.detectors.iter().map(build_detector).collect();
        pipeline = pipeline.with_anomaly_module(AnomalyModule::new(detectors));
    }
    if config.explainability.enabled {
        pipeline = pipeline.with_explainability(ExplainabilityModule::new(config.explainability.top_k));
    }
    if let Some(markets) = &config.features.markets_of_interest {
        pipeline = pipeline.with_markets_of_interest(markets.iter().cloned());
    }

    tracing::debug!(
        "Built pipeline '{}' with models {:?}",
        config.pipeline.name,
        pipeline.model_zoo().names()
    );
    Ok(pipeline)
}

pub fn build_ingestion(config: &DetectionConfig) -> Result<DataIngestion> {
    let mut ingestion = DataIngestion::empty();
    for source in config.trade_sources() {
        let built: Box<dyn TradeStreamSource> = match source.r#type {
            SourceType::Http => Box::new(build_http_source(source)?),
            SourceType::Csv | SourceType::Json => Box::new(build_file_source(source)?),
            SourceType::Memory => {
                Box::new(MemorySource::new(&source.name).with_trades(source.trades.clone()))
            }
        };
        ingestion.add_trade_source(built);
    }
    for source in config.resolution_sources() {
        let built: Box<dyn ResolutionStreamSource> = match source.r#type {
            SourceType::Http => Box::new(build_http_source(source)?),
            SourceType::Csv | SourceType::Json => Box::new(build_file_source(source)?),
            SourceType::Memory => Box::new(
                MemorySource::new(&source.name).with_resolutions(source.resolutions.clone()),
            ),
        };
        ingestion.add_resolution_source(built);
    }
    Ok(ingestion)
}

fn build_file_source(source: &SourceConfig) -> Result<FileSource> {
    let path = source
        .path
        .as_ref()
        .ok_or_else(|| DetectionError::MissingConfigError {
            field: format!("sources.{}.path", source.name),
        })?;
    Ok(match source.r#type {
        SourceType::Csv => FileSource::csv(&source.name, path),
        _ => FileSource::json(&source.name, path, source.format),
    })
}

fn build_http_source(source: &SourceConfig) -> Result<HttpSource> {
    let endpoint = source
        .endpoint
        .as_ref()
        .ok_or_else(|| DetectionError::MissingConfigError {
            field: format!("sources.{}.endpoint", source.name),
        })?;

    let mut http = match source.timeout_seconds {
        Some(secs) => HttpSource::with_timeout(&source.name, endpoint, Duration::from_secs(secs))?,
        None => HttpSource::new(&source.name, endpoint)?,
    }
    .with_format(source.format);

    if let Some(headers) = &source.headers {
        http = http.with_headers(headers.clone());
    }
    if let Some(attempts) = source.retry_attempts {
        let delay = Duration::from_secs(source.retry_delay_seconds.unwrap_or(1));
        http = http.with_retry(attempts, delay);
    }
    Ok(http)
}

pub fn build_model_zoo(models: &[ModelConfig]) -> Result<ModelZoo> {
    let mut zoo = ModelZoo::new();
    for model in models {
        let mut wrapper = match model.kind {
            ModelKind::Logistic => ModelWrapper::new(Box::new(LogisticModel::new(
                &model.name,
                model.weights.clone(),
                model.bias,
            ))),
            ModelKind::Rule => {
                ModelWrapper::new(Box::new(RuleModel::new(&model.name, model.rules.clone())))
            }
        };
        if let Some(post) = &model.postprocess {
            wrapper = wrapper.with_postprocess(Postprocess::from_name(post)?);
        }
        zoo.register(wrapper)?;
    }
    Ok(zoo)
}

fn build_detector(config: &DetectorConfig) -> Box<dyn AnomalyDetector> {
    match config.kind {
        DetectorKind::Zscore => Box::new(ZScoreDetector::new(&config.name, config.features.clone())),
        DetectorKind::Bounds => {
            let bounds = config
                .bounds
                .iter()
                .map(|(feature, [min, max])| (feature.clone(), (*min, *max)))
                .collect();
            Box::new(BoundsDetector::new(&config.name, bounds))
        }
    }
}

fn build_dispatcher(config: &DetectionConfig) -> AlertDispatcher {
    let alerts = &config.alerts;
    let mut dispatcher = AlertDispatcher::new(
        alerts.critical_threshold,
        alerts.high_threshold,
        alerts.medium_threshold,
    );
    for sink in &alerts.sinks {
        let built: Box<dyn AlertSink> = match sink {
            SinkConfig::Log => Box::new(TracingSink),
            SinkConfig::Jsonl { path } => Box::new(JsonLinesSink::new(path)),
            SinkConfig::Webhook { url } => Box::new(WebhookSink::new(url)),
        };
        dispatcher.add_sink(built);
    }
    dispatcher
}
