use crate::models::{ValueAssessment, ValueStatus};

use super::rules::RuleVerdict;

/// One classification source entering the blend. The rule source is always
/// present; a model source joins when a trained condition model covers the
/// analyte.
#[derive(Debug, Clone)]
pub enum StatusSignal {
    Rule { status: ValueStatus, confidence: f64 },
    Model { probability: f64, confidence: f64 },
}

impl StatusSignal {
    /// Position on the ordinal severity scale (0 normal, 1 low/high,
    /// 3 critical). A model source maps its abnormality probability onto the
    /// same scale so the two are blendable.
    fn tier_weight(&self) -> f64 {
        match self {
            Self::Rule { status, .. } => status.tier_weight(),
            Self::Model { probability, .. } => probability * 3.0,
        }
    }

    fn confidence(&self) -> f64 {
        match self {
            Self::Rule { confidence, .. } | Self::Model { confidence, .. } => *confidence,
        }
    }
}

/// A model's certainty either way: distance from the 0.5 decision boundary.
/// An abstaining model (p = 0.5) contributes nothing to the blend.
pub fn model_confidence(probability: f64) -> f64 {
    ((probability - 0.5).abs() * 2.0).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Blend
// ---------------------------------------------------------------------------

/// Combine the rule verdict with an optional model probability into the
/// final assessment for one value.
///
/// Blend weights are the sources' confidences renormalized to sum to 1.0;
/// with no model source the rule carries full weight. The status itself is
/// always the rule status — thresholds are ground truth for the tier, the
/// model sharpens or softens the severity magnitude.
pub fn assess(
    analyte: &str,
    value: f64,
    unit: &str,
    rule: &RuleVerdict,
    model_probability: Option<f64>,
) -> ValueAssessment {
    let mut signals = vec![StatusSignal::Rule {
        status: rule.status.clone(),
        confidence: rule.confidence,
    }];
    let model_conf = model_probability.map(model_confidence);
    if let Some(p) = model_probability {
        signals.push(StatusSignal::Model {
            probability: p.clamp(0.0, 1.0),
            confidence: model_confidence(p),
        });
    }

    ValueAssessment {
        analyte: analyte.to_string(),
        value,
        unit: unit.to_string(),
        status: rule.status.clone(),
        rule_confidence: rule.confidence,
        model_confidence: model_conf,
        severity: blend_severity(&signals),
    }
}

/// Confidence-weighted severity over any number of sources. Weights
/// renormalize to sum to 1.0; a zero-confidence source drops out entirely.
pub fn blend_severity(signals: &[StatusSignal]) -> f64 {
    let total: f64 = signals.iter().map(StatusSignal::confidence).sum();
    if total <= 0.0 {
        return 0.0;
    }
    signals
        .iter()
        .map(|s| (s.confidence() / total) * s.tier_weight())
        .sum::<f64>()
        .clamp(0.0, 3.0)
}
