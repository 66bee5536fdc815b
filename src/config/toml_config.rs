use crate::adapters::formats::SourceFormat;
use crate::core::ConfigProvider;
use crate::domain::model::{MarketResolution, TradeEvent};
use crate::utils::error::{DetectionError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub pipeline: PipelineInfo,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,
    #[serde(default)]
    pub explainability: ExplainabilityConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Csv,
    Json,
    Http,
    /// Inline `trades` / `resolutions` tables
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Trades,
    Resolutions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub r#type: SourceType,
    pub kind: SourceKind,
    pub path: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub format: SourceFormat,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub trades: Vec<TradeEvent>,
    #[serde(default)]
    pub resolutions: Vec<MarketResolution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub markets_of_interest: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            embedding_dim: default_embedding_dim(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_graph_threshold")]
    pub threshold: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_graph_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Logistic,
    Rule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub rules: BTreeMap<String, f64>,
    pub postprocess: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Zscore,
    Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub name: String,
    pub kind: DetectorKind,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub bounds: BTreeMap<String, [f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainabilityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ExplainabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_critical")]
    pub critical_threshold: f64,
    #[serde(default = "default_high")]
    pub high_threshold: f64,
    #[serde(default = "default_medium")]
    pub medium_threshold: f64,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            critical_threshold: default_critical(),
            high_threshold: default_high(),
            medium_threshold: default_medium(),
            sinks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Log,
    Jsonl { path: String },
    Webhook { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_report_filename")]
    pub report_filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn default_embedding_dim() -> usize {
    crate::core::sequence::DEFAULT_EMBEDDING_DIM
}

fn default_graph_threshold() -> f64 {
    crate::core::graph::DEFAULT_EDGE_THRESHOLD
}

fn default_top_k() -> usize {
    crate::core::explainability::DEFAULT_TOP_K
}

fn default_critical() -> f64 {
    crate::core::alerts::DEFAULT_CRITICAL_THRESHOLD
}

fn default_high() -> f64 {
    crate::core::alerts::DEFAULT_HIGH_THRESHOLD
}

fn default_medium() -> f64 {
    crate::core::alerts::DEFAULT_MEDIUM_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_report_filename() -> String {
    "detection_report.zip".to_string()
}

impl DetectionConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DetectionError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| DetectionError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn trade_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.kind == SourceKind::Trades)
    }

    pub fn resolution_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.kind == SourceKind::Resolutions)
    }

    fn validate_sources(&self, require_trade_source: bool) -> Result<()> {
        if require_trade_source && self.trade_sources().next().is_none() {
            return Err(DetectionError::MissingConfigError {
                field: "sources (kind = \"trades\")".to_string(),
            });
        }

        for source in &self.sources {
            validation::validate_non_empty_string("sources.name", &source.name)?;
            match source.r#type {
                SourceType::Csv | SourceType::Json => {
                    let path = validation::validate_required_field("sources.path", &source.path)?;
                    validation::validate_path("sources.path", path)?;
                }
                SourceType::Http => {
                    let endpoint =
                        validation::validate_required_field("sources.endpoint", &source.endpoint)?;
                    validation::validate_url("sources.endpoint", endpoint)?;
                }
                SourceType::Memory => {}
            }

            if source.format == SourceFormat::Polymarket
                && (source.kind == SourceKind::Resolutions
                    || matches!(source.r#type, SourceType::Csv | SourceType::Memory))
            {
                return Err(DetectionError::InvalidConfigValueError {
                    field: "sources.format".to_string(),
                    value: "polymarket".to_string(),
                    reason: format!(
                        "Source '{}': the polymarket format applies to JSON trade sources only",
                        source.name
                    ),
                });
            }
        }
        Ok(())
    }

    fn validate_models(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(DetectionError::MissingConfigError {
                field: "models".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            validation::validate_non_empty_string("models.name", &model.name)?;
            if !seen.insert(model.name.as_str()) {
                return Err(DetectionError::DuplicateModel {
                    name: model.name.clone(),
                });
            }
            if let Some(post) = &model.postprocess {
                crate::core::model_zoo::Postprocess::from_name(post)?;
            }
        }

        for (name, weight) in &self.ensemble.weights {
            if !seen.contains(name.as_str()) {
                return Err(DetectionError::ModelNotFound { name: name.clone() });
            }
            if *weight < 0.0 {
                return Err(DetectionError::InvalidConfigValueError {
                    field: format!("ensemble.weights.{}", name),
                    value: weight.to_string(),
                    reason: "Weights cannot be negative".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_alerts(&self) -> Result<()> {
        let alerts = &self.alerts;
        validation::validate_range("alerts.medium_threshold", alerts.medium_threshold, 0.0, 1.0)?;
        validation::validate_range("alerts.high_threshold", alerts.high_threshold, 0.0, 1.0)?;
        validation::validate_range(
            "alerts.critical_threshold",
            alerts.critical_threshold,
            0.0,
            1.0,
        )?;
        if !(alerts.medium_threshold <= alerts.high_threshold
            && alerts.high_threshold <= alerts.critical_threshold)
        {
            return Err(DetectionError::ConfigValidationError {
                field: "alerts".to_string(),
                message: "Thresholds must satisfy medium <= high <= critical".to_string(),
            });
        }

        for sink in &alerts.sinks {
            match sink {
                SinkConfig::Log => {}
                SinkConfig::Jsonl { path } => validation::validate_path("alerts.sinks.path", path)?,
                SinkConfig::Webhook { url } => validation::validate_url("alerts.sinks.url", url)?,
            }
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.validate_with(true)
    }

    /// 回測的交易來自命令列，不要求設定交易來源
    pub fn validate_for_backtest(&self) -> Result<()> {
        self.validate_with(false)
    }

    fn validate_with(&self, require_trade_source: bool) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        self.validate_sources(require_trade_source)?;
        self.validate_models()?;
        self.validate_alerts()?;

        validation::validate_positive_number("sequence.embedding_dim", self.sequence.embedding_dim, 1)?;
        validation::validate_positive_number("explainability.top_k", self.explainability.top_k, 1)?;
        validation::validate_range("graph.threshold", self.graph.threshold, 0.0, f64::MAX)?;

        for detector in &self.detectors {
            if detector.kind == DetectorKind::Zscore && detector.features.is_empty() {
                return Err(DetectionError::MissingConfigError {
                    field: format!("detectors.{}.features", detector.name),
                });
            }
        }

        validation::validate_path("output.output_path", &self.output.output_path)?;
        if self.output.compress {
            validation::validate_file_extensions(
                "output.report_filename",
                std::slice::from_ref(&self.output.report_filename),
                &["zip"],
            )?;
        }
        Ok(())
    }
}

impl ConfigProvider for DetectionConfig {
    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn report_filename(&self) -> &str {
        &self.output.report_filename
    }

    fn compress_output(&self) -> bool {
        self.output.compress
    }
}

impl Validate for DetectionConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
