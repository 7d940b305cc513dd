use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::engine::EngineError;
use crate::models::{LabeledExample, ModelKind};

use super::model::{train, RiskModel, TrainOptions};

/// Per-condition registry of served models.
///
/// Replacement is wholesale: a retrain builds its artifact completely off to
/// the side, then swaps the `Arc` under a short write lock. Readers clone
/// the `Arc` and keep working lock-free; mid-training they keep seeing the
/// prior version, and a failed or cancelled retrain changes nothing.
#[derive(Debug)]
pub struct RiskModelRegistry {
    models: RwLock<HashMap<String, Arc<RiskModel>>>,
}

impl RiskModelRegistry {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
        }
    }

    /// The served model for a condition. Never a default: an untrained
    /// condition is an error the caller must see.
    pub fn get(&self, condition: &str) -> Result<Arc<RiskModel>, EngineError> {
        let models = self.models.read().map_err(|_| EngineError::LockFailed)?;
        models
            .get(condition)
            .cloned()
            .ok_or_else(|| EngineError::ModelNotTrained {
                condition: condition.to_string(),
            })
    }

    pub fn version(&self, condition: &str) -> Result<Option<u32>, EngineError> {
        let models = self.models.read().map_err(|_| EngineError::LockFailed)?;
        Ok(models.get(condition).map(|m| m.version))
    }

    pub fn conditions(&self) -> Result<Vec<String>, EngineError> {
        let models = self.models.read().map_err(|_| EngineError::LockFailed)?;
        let mut names: Vec<String> = models.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Swap in a trained artifact, assigning the next version for its
    /// condition. The write lock covers only the insert.
    pub fn install(&self, mut model: RiskModel) -> Result<u32, EngineError> {
        let mut models = self.models.write().map_err(|_| EngineError::LockFailed)?;
        let version = models
            .get(&model.condition)
            .map(|current| current.version + 1)
            .unwrap_or(1);
        model.version = version;
        tracing::info!(
            condition = %model.condition,
            version,
            holdout_auc = model.metadata.holdout_auc,
            "risk model installed"
        );
        models.insert(model.condition.clone(), Arc::new(model));
        Ok(version)
    }

    /// Train then swap. Any training failure leaves the served model (or its
    /// absence) exactly as it was.
    pub fn train_and_install(
        &self,
        condition: &str,
        kind: ModelKind,
        feature_names: Vec<String>,
        examples: &[LabeledExample],
        opts: &TrainOptions,
    ) -> Result<u32, EngineError> {
        let model = train(condition, kind, feature_names, examples, opts)?;
        self.install(model)
    }
}

impl Default for RiskModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
