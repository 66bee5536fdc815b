use crate::core::pipeline::InsiderDetectionPipeline;
use crate::core::evaluation::compute_classification_metrics;
use crate::core::{ConfigProvider, Storage};
use crate::domain::model::{
    Alert, AnomalyScore, BacktestMetrics, EvaluationResult, Severity, TradeEvent,
};
use crate::utils::error::{DetectionError, Result};
use crate::utils::monitor::{PhaseTiming, SystemMonitor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const ALERTS_FILE: &str = "alerts.csv";
pub const EXPLANATIONS_FILE: &str = "explanations.json";
pub const ANOMALY_FILE: &str = "anomaly_scores.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const BACKTEST_FILE: &str = "backtest_metrics.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub alerts: usize,
    pub alerts_by_severity: BTreeMap<Severity, usize>,
    pub explanations: usize,
    pub anomaly_scores: usize,
    pub sinks_delivered: usize,
    pub sinks_failed: usize,
    pub phases: Vec<PhaseTiming>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub generated_at: DateTime<Utc>,
    pub trades: usize,
    pub metrics: BacktestMetrics,
    pub threshold: f64,
    pub evaluation: Option<EvaluationResult>,
}

/// Runs the pipeline and persists its report.
pub struct DetectionEngine<S: Storage, C: ConfigProvider> {
    pipeline: InsiderDetectionPipeline,
    storage: S,
    config: C,
    monitor: SystemMonitor,
}

impl<S: Storage, C: ConfigProvider> DetectionEngine<S, C> {
    pub fn new(pipeline: InsiderDetectionPipeline, storage: S, config: C) -> Self {
        Self::new_with_monitoring(pipeline, storage, config, false)
    }

    pub fn new_with_monitoring(
        pipeline: InsiderDetectionPipeline,
        storage: S,
        config: C,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            pipeline,
            storage,
            config,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &InsiderDetectionPipeline {
        &self.pipeline
    }

    /// 執行一次推論並寫出報表，回傳輸出路徑
    pub async fn run(&mut self) -> Result<String> {
        tracing::info!("🚀 Starting detection run");

        let alerts = self.pipeline.run_inference().await?;
        self.monitor.finish_phase("Inference");

        let summary = self.summarize(&alerts);
        let files = self.render_report(&alerts, &summary)?;
        let output_path = self.persist(files).await?;
        self.monitor.finish_phase("Report");
        self.monitor.log_final_stats();

        tracing::info!("📁 Report saved to: {}", output_path);
        Ok(output_path)
    }

    /// 歷史資料回測；有標註時一併計算 precision / recall / F1
    pub async fn run_backtest(
        &mut self,
        trades: &[TradeEvent],
        labels: Option<&HashMap<String, u8>>,
        threshold: f64,
    ) -> Result<BacktestReport> {
        tracing::info!("🚀 Starting backtest over {} trades", trades.len());

        // 與推論相同：先登記已結算市場，特徵才會使用實現損益
        let resolved = self.pipeline.load_resolutions().await?;
        tracing::info!("📥 Registered {} resolutions for backtest", resolved);

        let (metrics, scores) = self.pipeline.run_backtest_scored(trades);
        let evaluation =
            labels.map(|labels| compute_classification_metrics(&scores, labels, threshold));
        if let Some(result) = &evaluation {
            tracing::info!(
                "🎯 precision={:.3} recall={:.3} f1={:.3}",
                result.precision,
                result.recall,
                result.f1
            );
        }
        self.monitor.finish_phase("Backtest");

        let report = BacktestReport {
            generated_at: Utc::now(),
            trades: trades.len(),
            metrics,
            threshold,
            evaluation,
        };
        let data = serde_json::to_vec_pretty(&report)?;
        self.storage.write_file(BACKTEST_FILE, &data).await?;
        self.monitor.log_final_stats();

        tracing::info!(
            "📁 Backtest metrics saved to: {}/{}",
            self.config.output_path(),
            BACKTEST_FILE
        );
        Ok(report)
    }

    fn summarize(&self, alerts: &[Alert]) -> RunSummary {
        let mut alerts_by_severity = BTreeMap::new();
        for alert in alerts {
            *alerts_by_severity.entry(alert.severity).or_insert(0) += 1;
        }
        let dispatch = self.pipeline.last_dispatch();

        RunSummary {
            generated_at: Utc::now(),
            alerts: alerts.len(),
            alerts_by_severity,
            explanations: self.pipeline.explanations().len(),
            anomaly_scores: self.pipeline.anomaly_scores().len(),
            sinks_delivered: dispatch.delivered,
            sinks_failed: dispatch.failed,
            phases: self.monitor.phases().to_vec(),
        }
    }

    fn render_report(
        &self,
        alerts: &[Alert],
        summary: &RunSummary,
    ) -> Result<Vec<(&'static str, Vec<u8>)>> {
        Ok(vec![
            (ALERTS_FILE, alerts_csv(alerts)?),
            (
                EXPLANATIONS_FILE,
                serde_json::to_vec_pretty(self.pipeline.explanations())?,
            ),
            (ANOMALY_FILE, anomaly_csv(self.pipeline.anomaly_scores())?),
            (SUMMARY_FILE, serde_json::to_vec_pretty(summary)?),
        ])
    }

    async fn persist(&self, files: Vec<(&'static str, Vec<u8>)>) -> Result<String> {
        let base = self.config.output_path();

        if !self.config.compress_output() {
            for (name, data) in &files {
                tracing::debug!("Writing {} ({} bytes)", name, data.len());
                self.storage.write_file(name, data).await?;
            }
            return Ok(base.to_string());
        }

        let report_name = self.config.report_filename();
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file(*name, SimpleFileOptions::default())?;
                zip.write_all(data)?;
            }
            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(report_name, &zip_data).await?;
        Ok(format!("{}/{}", base, report_name))
    }
}

fn alerts_csv(alerts: &[Alert]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // 沒有警示時仍輸出表頭
    writer.write_record(["entity_id", "score", "severity", "message"])?;
    for alert in alerts {
        let score = format!("{:.4}", alert.score);
        writer.write_record([
            alert.entity_id.as_str(),
            score.as_str(),
            alert.severity.as_str(),
            alert.message.as_str(),
        ])?;
    }
    into_bytes(writer)
}

fn anomaly_csv(scores: &[AnomalyScore]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["entity_id", "detector_name", "score"])?;
    for score in scores {
        let value = format!("{:.6}", score.score);
        writer.write_record([
            score.entity_id.as_str(),
            score.detector_name.as_str(),
            value.as_str(),
        ])?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| DetectionError::IoError(e.into_error()))
}
