use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One training example: features in the order declared by the condition's
/// feature list, and the outcome label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: Vec<f64>,
    pub label: bool,
}

impl LabeledExample {
    pub fn new(features: Vec<f64>, label: bool) -> Self {
        Self { features, label }
    }
}

/// Provenance recorded inside every trained artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: DateTime<Utc>,
    pub examples: usize,
    pub iterations: usize,
    pub final_loss: f64,
    /// ROC AUC on the seeded holdout split; 0.5 when the holdout carried a
    /// single class.
    pub holdout_auc: f64,
}

/// Output of one risk model evaluation.
///
/// `attributions` are margin-space (log-odds) contributions sorted by
/// absolute magnitude; `baseline + sum(attributions)` is the prediction's
/// margin and `sigmoid` of it reproduces `probability`. Kinds that cannot
/// attribute leave the list empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub condition: String,
    pub probability: f64,
    pub model_version: u32,
    pub baseline: f64,
    pub attributions: Vec<(String, f64)>,
}

impl RiskPrediction {
    pub fn top_influence(&self) -> Option<&(String, f64)> {
        self.attributions.first()
    }
}
