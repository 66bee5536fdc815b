use crate::domain::model::{FeatureVector, ModelPrediction};
use crate::domain::ports::PredictiveModel;
use crate::utils::error::{DetectionError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 原始分數的後處理
#[derive(Clone)]
pub enum Postprocess {
    Clamp,
    Sigmoid,
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Postprocess {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "clamp" => Ok(Postprocess::Clamp),
            "sigmoid" => Ok(Postprocess::Sigmoid),
            other => Err(DetectionError::InvalidConfigValueError {
                field: "models.postprocess".to_string(),
                value: other.to_string(),
                reason: "Supported postprocess steps: clamp, sigmoid".to_string(),
            }),
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            Postprocess::Clamp => raw.clamp(0.0, 1.0),
            Postprocess::Sigmoid => sigmoid(raw),
            Postprocess::Custom(f) => f(raw),
        }
    }
}

impl fmt::Debug for Postprocess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Postprocess::Clamp => f.write_str("Clamp"),
            Postprocess::Sigmoid => f.write_str("Sigmoid"),
            Postprocess::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Wraps a predictive model with standardized inference.
pub struct ModelWrapper {
    name: String,
    model: Box<dyn PredictiveModel>,
    postprocess: Option<Postprocess>,
}

impl ModelWrapper {
    pub fn new(model: Box<dyn PredictiveModel>) -> Self {
        Self {
            name: model.name().to_string(),
            model,
            postprocess: None,
        }
    }

    /// 以不同名稱註冊同一種模型
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_postprocess(mut self, postprocess: Postprocess) -> Self {
        self.postprocess = Some(postprocess);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predict(&self, vector: &FeatureVector) -> ModelPrediction {
        let raw_score = self.model.predict_proba(&vector.features);
        let score = self
            .postprocess
            .as_ref()
            .map_or(raw_score, |post| post.apply(raw_score));

        let mut metadata = BTreeMap::new();
        metadata.insert("raw_score".to_string(), raw_score);

        ModelPrediction {
            model_name: self.name.clone(),
            entity_id: vector.entity_id.clone(),
            score,
            metadata,
        }
    }
}

impl fmt::Debug for ModelWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelWrapper")
            .field("name", &self.name)
            .field("postprocess", &self.postprocess)
            .finish()
    }
}

/// Registry of heterogeneous models, iterated in registration order.
#[derive(Debug, Default)]
pub struct ModelZoo {
    models: Vec<ModelWrapper>,
}

impl ModelZoo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(models: Vec<ModelWrapper>) -> Result<Self> {
        let mut zoo = Self::new();
        for model in models {
            zoo.register(model)?;
        }
        Ok(zoo)
    }

    pub fn register(&mut self, wrapper: ModelWrapper) -> Result<()> {
        if self.models.iter().any(|m| m.name == wrapper.name) {
            return Err(DetectionError::DuplicateModel { name: wrapper.name });
        }
        tracing::debug!("Registered model '{}'", wrapper.name);
        self.models.push(wrapper);
        Ok(())
    }

    pub fn iter_models(&self) -> impl Iterator<Item = &ModelWrapper> {
        self.models.iter()
    }

    pub fn get(&self, name: &str) -> Result<&ModelWrapper> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| DetectionError::ModelNotFound {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
