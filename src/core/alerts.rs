use crate::domain::model::{Alert, EnsembleScore, Severity};
use crate::domain::ports::AlertSink;
use serde::Serialize;

pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 0.9;
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Turns ensemble scores into graded alerts and fans them out to sinks.
pub struct AlertDispatcher {
    critical_threshold: f64,
    high_threshold: f64,
    medium_threshold: f64,
    sinks: Vec<Box<dyn AlertSink>>,
    sent_alerts: Vec<Alert>,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_CRITICAL_THRESHOLD,
            DEFAULT_HIGH_THRESHOLD,
            DEFAULT_MEDIUM_THRESHOLD,
        )
    }
}

impl AlertDispatcher {
    pub fn new(critical_threshold: f64, high_threshold: f64, medium_threshold: f64) -> Self {
        Self {
            critical_threshold,
            high_threshold,
            medium_threshold,
            sinks: Vec::new(),
            sent_alerts: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn sent_alerts(&self) -> &[Alert] {
        &self.sent_alerts
    }

    pub fn determine_severity(&self, score: f64) -> Severity {
        if score >= self.critical_threshold {
            Severity::Critical
        } else if score >= self.high_threshold {
            Severity::High
        } else if score >= self.medium_threshold {
            Severity::Medium
        } else {
            Severity::Info
        }
    }

    pub fn create_alerts(&self, scores: &[EnsembleScore]) -> Vec<Alert> {
        scores
            .iter()
            .filter_map(|score| {
                let severity = self.determine_severity(score.score);
                if severity == Severity::Info {
                    return None;
                }
                Some(Alert {
                    entity_id: score.entity_id.clone(),
                    score: score.score,
                    severity,
                    message: format!(
                        "Account {} flagged with severity {} (score={:.2}).",
                        score.entity_id, severity, score.score
                    ),
                })
            })
            .collect()
    }

    /// 記錄並送出警示；單一 sink 失敗不影響其他 sink
    pub async fn dispatch(&mut self, alerts: &[Alert]) -> DispatchSummary {
        self.sent_alerts.extend_from_slice(alerts);

        let mut summary = DispatchSummary::default();
        if alerts.is_empty() {
            return summary;
        }

        for sink in &self.sinks {
            match sink.send(alerts).await {
                Ok(()) => {
                    tracing::debug!("Delivered {} alerts to '{}'", alerts.len(), sink.name());
                    summary.delivered += 1;
                }
                Err(e) => {
                    tracing::error!("❌ Alert sink '{}' failed: {}", sink.name(), e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
