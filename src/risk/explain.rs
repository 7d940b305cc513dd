//! Additive attribution for served predictions.
//!
//! For a linear model the log-odds margin decomposes exactly: baseline
//! (intercept) plus one term per feature. Pushing that sum back through the
//! sigmoid reproduces the served probability, so a narrative built from the
//! top terms can never drift from the number shown next to it. Stumps have
//! no additive decomposition and say so instead of faking one.

use crate::engine::EngineError;
use crate::models::RiskPrediction;

use super::model::{sigmoid, ModelParams, RiskModel};

/// Per-feature contributions in margin (log-odds) space, largest magnitude
/// first, with the model's baseline.
pub fn explain(
    model: &RiskModel,
    features: &[f64],
) -> Result<(f64, Vec<(String, f64)>), EngineError> {
    if features.len() != model.feature_names.len() {
        return Err(EngineError::FeatureMismatch {
            condition: model.condition.clone(),
            expected: model.feature_names.len(),
            got: features.len(),
        });
    }
    let (baseline, terms) =
        model
            .margin_terms(features)
            .ok_or_else(|| EngineError::ExplanationUnavailable {
                condition: model.condition.clone(),
            })?;
    let mut attributions: Vec<(String, f64)> = model
        .feature_names
        .iter()
        .cloned()
        .zip(terms)
        .collect();
    attributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    Ok((baseline, attributions))
}

/// A prediction carrying whatever attribution its model kind supports:
/// exact margin terms for logistic models, an empty list (prior as the
/// baseline) for stumps.
pub fn predict_with_explanation(
    model: &RiskModel,
    features: &[f64],
) -> Result<RiskPrediction, EngineError> {
    match &model.params {
        ModelParams::Logistic { .. } => {
            let (baseline, attributions) = explain(model, features)?;
            let margin: f64 = baseline + attributions.iter().map(|(_, term)| term).sum::<f64>();
            Ok(RiskPrediction {
                condition: model.condition.clone(),
                probability: sigmoid(margin),
                model_version: model.version,
                baseline,
                attributions,
            })
        }
        ModelParams::Stump { prior, .. } => Ok(RiskPrediction {
            condition: model.condition.clone(),
            probability: model.predict_probability(features)?,
            model_version: model.version,
            baseline: *prior,
            attributions: Vec::new(),
        }),
    }
}
