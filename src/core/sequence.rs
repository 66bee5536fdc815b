use crate::domain::model::{FeatureVector, SequenceEmbedding, TradeEvent};
use std::collections::HashMap;

pub const DEFAULT_EMBEDDING_DIM: usize = 8;

/// Temporal embeddings of each account's trade sequence.
///
/// Every trade contributes a sinusoidal positional encoding of its rank in
/// the account's time-ordered history; the embedding is the sum over trades.
#[derive(Debug, Clone)]
pub struct SequenceModule {
    embedding_dim: usize,
}

impl Default for SequenceModule {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl SequenceModule {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn encode(&self, trades: &[TradeEvent]) -> Vec<SequenceEmbedding> {
        // 依帳號首次出現順序分組
        let mut order: Vec<&str> = Vec::new();
        let mut sequences: HashMap<&str, Vec<&TradeEvent>> = HashMap::new();
        for trade in trades {
            let entry = sequences.entry(trade.account_id.as_str()).or_insert_with(|| {
                order.push(trade.account_id.as_str());
                Vec::new()
            });
            entry.push(trade);
        }

        order
            .into_iter()
            .map(|entity_id| {
                let mut trade_seq = sequences.remove(entity_id).unwrap_or_default();
                trade_seq.sort_by_key(|trade| trade.timestamp);
                SequenceEmbedding {
                    entity_id: entity_id.to_string(),
                    values: self.positional_encoding(trade_seq.len()),
                }
            })
            .collect()
    }

    pub fn enrich_features(
        &self,
        features: Vec<FeatureVector>,
        embeddings: &[SequenceEmbedding],
    ) -> Vec<FeatureVector> {
        let lookup: HashMap<&str, &SequenceEmbedding> = embeddings
            .iter()
            .map(|embedding| (embedding.entity_id.as_str(), embedding))
            .collect();

        features
            .into_iter()
            .map(|mut vector| {
                if let Some(embedding) = lookup.get(vector.entity_id.as_str()) {
                    for (idx, value) in embedding.values.iter().enumerate() {
                        vector.features.insert(format!("seq_{}", idx), *value);
                    }
                }
                vector
            })
            .collect()
    }

    // 只有排序後的位置會影響編碼
    fn positional_encoding(&self, sequence_len: usize) -> Vec<f64> {
        let dim = self.embedding_dim;
        let mut values = vec![0.0; dim];
        for position in 0..sequence_len {
            for (idx, value) in values.iter_mut().enumerate() {
                let exponent = (2 * (idx / 2)) as f64 / dim as f64;
                let angle = position as f64 / 10_000f64.powf(exponent);
                *value += if idx % 2 == 0 { angle.sin() } else { angle.cos() };
            }
        }
        values
    }
}
