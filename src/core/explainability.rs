use crate::domain::model::{EnsembleScore, Explanation, FeatureMap};

pub const DEFAULT_TOP_K: usize = 3;

/// Produces lightweight explanations from feature magnitudes and the
/// ensemble breakdown.
#[derive(Debug, Clone)]
pub struct ExplainabilityModule {
    top_k: usize,
}

impl Default for ExplainabilityModule {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl ExplainabilityModule {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn build_explanation(
        &self,
        features: &FeatureMap,
        ensemble_score: &EnsembleScore,
    ) -> Explanation {
        let mut ranked: Vec<(&String, f64)> = features.iter().map(|(k, v)| (k, *v)).collect();
        // 穩定排序：絕對值相同時保留名稱順序
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        let top_features = ranked
            .into_iter()
            .take(self.top_k)
            .map(|(name, _)| name.clone())
            .collect();

        let breakdown = ensemble_score
            .breakdown
            .iter()
            .map(|(model, score)| format!("{}={:.2}", model, score))
            .collect::<Vec<_>>()
            .join(", ");

        Explanation {
            entity_id: ensemble_score.entity_id.clone(),
            top_features,
            narrative: format!(
                "Ensemble score {:.2} derived from models: {}",
                ensemble_score.score, breakdown
            ),
        }
    }
}
