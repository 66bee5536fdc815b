//! Built-in predictive models, fully parameterized from configuration.

use crate::core::model_zoo::sigmoid;
use crate::domain::model::FeatureMap;
use crate::domain::ports::PredictiveModel;
use std::collections::BTreeMap;

/// `σ(bias + Σ wᵢ·xᵢ)`; missing features count as zero.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    weights: BTreeMap<String, f64>,
    bias: f64,
}

impl LogisticModel {
    pub fn new(name: impl Into<String>, weights: BTreeMap<String, f64>, bias: f64) -> Self {
        Self {
            name: name.into(),
            weights,
            bias,
        }
    }
}

impl PredictiveModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureMap) -> f64 {
        let logit = self
            .weights
            .iter()
            .map(|(name, weight)| weight * features.get(name).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.bias;
        sigmoid(logit)
    }
}

/// Fraction of `feature >= threshold` rules that fire.
#[derive(Debug, Clone)]
pub struct RuleModel {
    name: String,
    rules: BTreeMap<String, f64>,
}

impl RuleModel {
    pub fn new(name: impl Into<String>, rules: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

impl PredictiveModel for RuleModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureMap) -> f64 {
        if self.rules.is_empty() {
            return 0.0;
        }
        let fired = self
            .rules
            .iter()
            .filter(|(name, threshold)| {
                features
                    .get(name.as_str())
                    .is_some_and(|value| value >= *threshold)
            })
            .count();
        fired as f64 / self.rules.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::features;

    #[test]
    fn test_logistic_model() {
        let mut weights = BTreeMap::new();
        weights.insert("profit_proxy".to_string(), 2.0);
        weights.insert("missing".to_string(), 5.0);
        let model = LogisticModel::new("logit", weights, -1.0);

        assert_eq!(model.predict_proba(&features(&[("profit_proxy", 0.5)])), 0.5);
        assert!(model.predict_proba(&features(&[("profit_proxy", 3.0)])) > 0.99);
    }

    #[test]
    fn test_rule_model_fraction() {
        let mut rules = BTreeMap::new();
        rules.insert("avg_trade_size".to_string(), 1_000.0);
        rules.insert("profit_proxy".to_string(), 0.5);
        let model = RuleModel::new("rules", rules);

        let score = model.predict_proba(&features(&[("avg_trade_size", 1_000.0), ("profit_proxy", 0.1)]));
        assert_eq!(score, 0.5);
        assert_eq!(RuleModel::new("empty", BTreeMap::new()).predict_proba(&features(&[])), 0.0);
    }
}
