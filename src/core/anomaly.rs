use crate::domain::model::{AnomalyScore, FeatureMap, FeatureVector};
use crate::domain::ports::AnomalyDetector;
use std::collections::BTreeMap;

/// Coordinates multiple anomaly detectors.
pub struct AnomalyModule {
    detectors: Vec<Box<dyn AnomalyDetector>>,
}

impl AnomalyModule {
    pub fn new(detectors: Vec<Box<dyn AnomalyDetector>>) -> Self {
        Self { detectors }
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn fit(&mut self, vectors: &[FeatureVector]) {
        for detector in &mut self.detectors {
            detector.fit(vectors);
        }
    }

    /// 每個向量對每個偵測器各產生一筆分數（以向量為主序）
    pub fn run(&self, vectors: &[FeatureVector]) -> Vec<AnomalyScore> {
        let mut scores = Vec::with_capacity(vectors.len() * self.detectors.len());
        for vector in vectors {
            for detector in &self.detectors {
                scores.push(AnomalyScore {
                    entity_id: vector.entity_id.clone(),
                    detector_name: detector.name().to_string(),
                    score: detector.score(&vector.features),
                });
            }
        }
        scores
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Baseline {
    mean: f64,
    std: f64,
}

/// Largest absolute z-score across the watched features.
///
/// The baseline is re-estimated from each batch passed to `fit`, so scores
/// are relative to the accounts seen in the same run.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    name: String,
    features: Vec<String>,
    baselines: BTreeMap<String, Baseline>,
}

impl ZScoreDetector {
    pub fn new(name: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            name: name.into(),
            features,
            baselines: BTreeMap::new(),
        }
    }
}

impl AnomalyDetector for ZScoreDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, vectors: &[FeatureVector]) {
        self.baselines.clear();
        for feature in &self.features {
            let values: Vec<f64> = vectors
                .iter()
                .filter_map(|v| v.features.get(feature).copied())
                .collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            self.baselines.insert(
                feature.clone(),
                Baseline {
                    mean,
                    std: variance.sqrt(),
                },
            );
        }
    }

    fn score(&self, features: &FeatureMap) -> f64 {
        self.features
            .iter()
            .filter_map(|name| {
                let baseline = self.baselines.get(name)?;
                let value = features.get(name)?;
                if baseline.std == 0.0 {
                    return None;
                }
                Some(((value - baseline.mean) / baseline.std).abs())
            })
            .fold(0.0, f64::max)
    }
}

/// Sum of distances by which features fall outside fixed bounds.
#[derive(Debug, Clone)]
pub struct BoundsDetector {
    name: String,
    bounds: BTreeMap<String, (f64, f64)>,
}

impl BoundsDetector {
    pub fn new(name: impl Into<String>, bounds: BTreeMap<String, (f64, f64)>) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }
}

impl AnomalyDetector for BoundsDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, features: &FeatureMap) -> f64 {
        self.bounds
            .iter()
            .filter_map(|(name, (min, max))| {
                let value = *features.get(name)?;
                Some(if value < *min {
                    min - value
                } else if value > *max {
                    value - max
                } else {
                    0.0
                })
            })
            .sum()
    }
}
