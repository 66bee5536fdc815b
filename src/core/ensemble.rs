use crate::domain::model::{EnsembleScore, ModelPrediction};
use std::collections::{BTreeMap, HashMap};

/// Combine model predictions via weighted averages.
#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    weights: BTreeMap<String, f64>,
}

impl EnsembleCombiner {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// 依帳號分組；同一模型多筆預測時以最後一筆為準
    pub fn combine(&self, predictions: &[ModelPrediction]) -> Vec<EnsembleScore> {
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, BTreeMap<String, f64>> = HashMap::new();
        for prediction in predictions {
            grouped
                .entry(prediction.entity_id.as_str())
                .or_insert_with(|| {
                    order.push(prediction.entity_id.as_str());
                    BTreeMap::new()
                })
                .insert(prediction.model_name.clone(), prediction.score);
        }

        order
            .into_iter()
            .map(|entity_id| {
                let breakdown = grouped.remove(entity_id).unwrap_or_default();
                EnsembleScore {
                    entity_id: entity_id.to_string(),
                    score: self.weighted_average(&breakdown),
                    breakdown,
                }
            })
            .collect()
    }

    /// Mean score per model.
    pub fn aggregate_statistics(&self, predictions: &[ModelPrediction]) -> BTreeMap<String, f64> {
        let mut by_model: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for prediction in predictions {
            let entry = by_model.entry(prediction.model_name.as_str()).or_default();
            entry.0 += prediction.score;
            entry.1 += 1;
        }
        by_model
            .into_iter()
            .map(|(name, (sum, count))| (name.to_string(), sum / count as f64))
            .collect()
    }

    fn weighted_average(&self, model_scores: &BTreeMap<String, f64>) -> f64 {
        if model_scores.is_empty() {
            return 0.0;
        }

        let mean = model_scores.values().sum::<f64>() / model_scores.len() as f64;
        if self.weights.is_empty() {
            return mean;
        }

        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;
        for (name, score) in model_scores {
            let weight = self.weights.get(name).copied().unwrap_or(0.0);
            total_weight += weight;
            weighted_sum += weight * score;
        }

        if total_weight != 0.0 {
            weighted_sum / total_weight
        } else {
            mean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(model: &str, entity: &str, score: f64) -> ModelPrediction {
        ModelPrediction {
            model_name: model.to_string(),
            entity_id: entity.to_string(),
            score,
            metadata: BTreeMap::new(),
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_unweighted_mean_in_first_seen_order() {
        let combiner = EnsembleCombiner::default();
        let scores = combiner.combine(&[
            prediction("a", "bob", 0.2),
            prediction("a", "alice", 0.9),
            prediction("b", "bob", 0.6),
        ]);

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].entity_id, "bob");
        assert!((scores[0].score - 0.4).abs() < 1e-12);
        assert_eq!(scores[0].breakdown.len(), 2);
        assert_eq!(scores[1].score, 0.9);
    }

    #[test]
    fn test_weighted_average_ignores_unweighted_models() {
        let combiner = EnsembleCombiner::new(weights(&[("a", 3.0), ("b", 1.0)]));
        let scores = combiner.combine(&[
            prediction("a", "x", 1.0),
            prediction("b", "x", 0.0),
            prediction("c", "x", 0.5),
        ]);
        assert_eq!(scores[0].score, 0.75);
    }

    #[test]
    fn test_zero_total_weight_falls_back_to_mean() {
        let combiner = EnsembleCombiner::new(weights(&[("other", 1.0)]));
        let scores = combiner.combine(&[prediction("a", "x", 0.2), prediction("b", "x", 0.4)]);
        assert!((scores[0].score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_last_prediction_per_model_wins() {
        let combiner = EnsembleCombiner::default();
        let scores = combiner.combine(&[prediction("a", "x", 0.1), prediction("a", "x", 0.8)]);
        assert_eq!(scores[0].score, 0.8);
        assert_eq!(scores[0].breakdown["a"], 0.8);
    }

    #[test]
    fn test_aggregate_statistics() {
        let combiner = EnsembleCombiner::default();
        let stats = combiner.aggregate_statistics(&[
            prediction("a", "x", 0.2),
            prediction("a", "y", 0.4),
            prediction("b", "x", 1.0),
        ]);
        assert!((stats["a"] - 0.3).abs() < 1e-12);
        assert_eq!(stats["b"], 1.0);
        assert!(combiner.aggregate_statistics(&[]).is_empty());
        assert!(combiner.combine(&[]).is_empty());
    }
}
