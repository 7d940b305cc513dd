use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ValueStatus;
use super::risk::RiskPrediction;
use super::trend::TrendVerdict;

/// Interpretation of a single analyte value: the rule-derived status plus the
/// confidence-weighted severity blend. Values are in the canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub analyte: String,
    pub value: f64,
    pub unit: String,
    pub status: ValueStatus,
    /// Certainty of the threshold classification, in `[floor, 1.0]`.
    pub rule_confidence: f64,
    /// Certainty of the model signal that entered the blend, when one did.
    pub model_confidence: Option<f64>,
    /// Blended tier weight in `[0.0, 3.0]`.
    pub severity: f64,
}

/// The immutable scored form of one report. Once appended to a history it is
/// never recomputed in place; corrections arrive as new reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportScore {
    pub report_id: Uuid,
    pub subject_id: String,
    pub taken_at: NaiveDateTime,
    /// Ordered by analyte name.
    pub assessments: Vec<ValueAssessment>,
    pub aggregate_severity: f64,
    pub narrative: String,
}

impl ReportScore {
    pub fn assessment(&self, analyte: &str) -> Option<&ValueAssessment> {
        self.assessments.iter().find(|a| a.analyte == analyte)
    }

    pub fn abnormal_count(&self) -> usize {
        self.assessments
            .iter()
            .filter(|a| !a.status.is_normal())
            .count()
    }
}

/// A condition whose risk prediction was skipped, with the reason the caller
/// would otherwise have lost. Skips never abort the rest of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCondition {
    pub condition: String,
    pub reason: String,
}

/// Everything one scoring pass produces: the stored score plus the
/// longitudinal and predictive layers around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub score: ReportScore,
    pub trends: Vec<TrendVerdict>,
    pub predictions: Vec<RiskPrediction>,
    pub skipped: Vec<SkippedCondition>,
    pub guidance: Vec<String>,
}

impl ReportOutcome {
    pub fn trend(&self, analyte: &str) -> Option<&TrendVerdict> {
        self.trends.iter().find(|t| t.analyte == analyte)
    }

    pub fn prediction(&self, condition: &str) -> Option<&RiskPrediction> {
        self.predictions.iter().find(|p| p.condition == condition)
    }

    pub fn warning_count(&self) -> usize {
        self.trends.iter().filter(|t| t.warning).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn score_with(statuses: &[(&str, ValueStatus)]) -> ReportScore {
        ReportScore {
            report_id: Uuid::new_v4(),
            subject_id: "subject-1".into(),
            taken_at: NaiveDate::from_ymd_opt(2024, 5, 2)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            assessments: statuses
                .iter()
                .map(|(name, status)| ValueAssessment {
                    analyte: name.to_string(),
                    value: 1.0,
                    unit: "g/dL".into(),
                    status: status.clone(),
                    rule_confidence: 1.0,
                    model_confidence: None,
                    severity: status.tier_weight(),
                })
                .collect(),
            aggregate_severity: 0.0,
            narrative: String::new(),
        }
    }

    #[test]
    fn abnormal_count_ignores_normal_values() {
        let score = score_with(&[
            ("hemoglobin", ValueStatus::Low),
            ("wbc", ValueStatus::Normal),
            ("ldl", ValueStatus::High),
        ]);
        assert_eq!(score.abnormal_count(), 2);
        assert!(score.assessment("wbc").is_some());
        assert!(score.assessment("glucose").is_none());
    }
}
