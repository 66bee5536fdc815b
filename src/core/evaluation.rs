use crate::domain::model::{EnsembleScore, EvaluationResult};
use crate::utils::error::{DetectionError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct LabelRow {
    entity_id: String,
    label: u8,
}

/// Precision / recall / F1 of thresholded ensemble scores.
///
/// Entities absent from `ground_truth` count as negatives.
pub fn compute_classification_metrics(
    predictions: &[EnsembleScore],
    ground_truth: &HashMap<String, u8>,
    threshold: f64,
) -> EvaluationResult {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for prediction in predictions {
        let positive = ground_truth.get(&prediction.entity_id).copied().unwrap_or(0) == 1;
        let flagged = prediction.score >= threshold;
        match (flagged, positive) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationResult {
        precision,
        recall,
        f1,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
    }
}

/// 讀取 `entity_id,label` 格式的標註 CSV
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<HashMap<String, u8>> {
    let mut reader = csv::Reader::from_path(path)?;
    parse_labels(&mut reader)
}

pub fn parse_labels<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<HashMap<String, u8>> {
    let mut labels = HashMap::new();
    for row in reader.deserialize::<LabelRow>() {
        let row = row?;
        if row.label > 1 {
            return Err(DetectionError::ValidationError {
                message: format!(
                    "Label for '{}' must be 0 or 1, got {}",
                    row.entity_id, row.label
                ),
            });
        }
        labels.insert(row.entity_id, row.label);
    }
    Ok(labels)
}
