//! Background retraining — off-thread model refresh.
//!
//! A retrain runs on its own thread against a snapshot of labeled examples,
//! observing a cancel flag between iterations. Only a successful run swaps
//! the registry; scoring keeps serving the prior model the whole time, so
//! cancelling or failing a retrain costs nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{ConditionSpec, RiskConfig};
use crate::engine::EngineError;
use crate::models::LabeledExample;

use super::model::TrainOptions;
use super::registry::RiskModelRegistry;

/// Handle for one in-flight retrain.
///
/// Supports cooperative cancellation via `cancel()` or automatic cleanup on
/// `Drop`: dropping the handle cancels the run and joins the thread.
pub struct RetrainHandle {
    condition: String,
    cancel: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<Result<u32, EngineError>>>,
}

impl RetrainHandle {
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Ask the run to stop at its next iteration boundary. The registry
    /// keeps serving whatever it served before.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the outcome: the installed version, or why nothing was
    /// installed.
    pub fn join(mut self) -> Result<u32, EngineError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| EngineError::LockFailed)?,
            None => Err(EngineError::TrainingCancelled {
                condition: self.condition.clone(),
            }),
        }
    }
}

impl Drop for RetrainHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Start a retrain for one condition on a separate thread.
///
/// The examples are snapshotted by the caller; nothing in the serving path
/// is locked while the thread runs.
pub fn spawn_retrain(
    registry: Arc<RiskModelRegistry>,
    spec: &ConditionSpec,
    examples: Vec<LabeledExample>,
    config: &RiskConfig,
) -> RetrainHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let condition = spec.name.clone();
    let kind = spec.model_kind.clone();
    let feature_names = spec.feature_names();
    let config = config.clone();

    let thread_condition = condition.clone();
    let handle = std::thread::spawn(move || {
        tracing::info!(
            condition = %thread_condition,
            examples = examples.len(),
            "background retrain started"
        );
        let opts = TrainOptions {
            cancel: Some(flag.as_ref()),
            ..TrainOptions::from_config(&config)
        };
        let result =
            registry.train_and_install(&thread_condition, kind, feature_names, &examples, &opts);
        match &result {
            Ok(version) => {
                tracing::info!(condition = %thread_condition, version, "background retrain installed")
            }
            Err(e) => {
                tracing::warn!(condition = %thread_condition, error = %e, "background retrain abandoned")
            }
        }
        result
    });

    RetrainHandle {
        condition,
        cancel,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;

    fn infection_spec() -> ConditionSpec {
        ConditionSpec {
            name: "infection".into(),
            model_kind: ModelKind::Logistic,
            value_features: vec!["wbc".into(), "platelets".into()],
            slope_features: vec![],
            use_age: false,
        }
    }

    fn separable(n_per_class: usize) -> Vec<LabeledExample> {
        let mut examples = Vec::new();
        for i in 0..n_per_class {
            let jitter = i as f64 * 0.01;
            examples.push(LabeledExample::new(vec![1.0 + jitter, 2.0 + jitter], false));
            examples.push(LabeledExample::new(vec![5.0 + jitter, 8.0 + jitter], true));
        }
        examples
    }

    #[test]
    fn retrain_installs_on_success() {
        let registry = Arc::new(RiskModelRegistry::new());
        let handle = spawn_retrain(
            Arc::clone(&registry),
            &infection_spec(),
            separable(20),
            &RiskConfig::default(),
        );
        let version = handle.join().unwrap();
        assert_eq!(version, 1);
        assert_eq!(registry.get("infection").unwrap().version, 1);
    }

    #[test]
    fn failed_retrain_installs_nothing() {
        let registry = Arc::new(RiskModelRegistry::new());
        let handle = spawn_retrain(
            Arc::clone(&registry),
            &infection_spec(),
            separable(3), // below the example floor
            &RiskConfig::default(),
        );
        let err = handle.join().unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
        assert!(matches!(
            registry.get("infection").unwrap_err(),
            EngineError::ModelNotTrained { .. }
        ));
    }

    #[test]
    fn drop_cancels_and_joins_without_hanging() {
        let registry = Arc::new(RiskModelRegistry::new());
        let handle = spawn_retrain(
            Arc::clone(&registry),
            &infection_spec(),
            separable(20),
            &RiskConfig::default(),
        );
        assert_eq!(handle.condition(), "infection");
        drop(handle);
        // Whether the run finished or was cancelled, the registry stays usable.
        assert!(registry.version("infection").is_ok());
    }

    #[test]
    fn cancel_flag_sets_atomic() {
        let handle = RetrainHandle {
            condition: "infection".into(),
            cancel: Arc::new(AtomicBool::new(false)),
            handle: None,
        };
        assert!(!handle.cancel.load(Ordering::Relaxed));
        handle.cancel();
        assert!(handle.cancel.load(Ordering::Relaxed));
        assert!(handle.is_finished());
    }
}
