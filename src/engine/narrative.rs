use crate::models::{RiskPrediction, TrendDirection, TrendVerdict, ValueAssessment, ValueStatus};

/// Narrative template builder for consistent, calm framing.
/// No alarm wording, no red alerts. Statuses are stated plainly and every
/// narrative defers to a clinician instead of diagnosing.
pub struct NarrativeTemplates;

impl NarrativeTemplates {
    /// Opening line: how many values sit outside their ranges.
    pub fn summary_line(total: usize, abnormal: usize) -> String {
        if total == 0 {
            "No recognized values were found in this report.".to_string()
        } else if abnormal == 0 {
            format!(
                "All {} measured values sit within their reference ranges.",
                total
            )
        } else {
            format!(
                "{} of {} measured values sit outside their reference ranges.",
                abnormal, total
            )
        }
    }

    /// One sentence per out-of-range value. Normal values make no line.
    pub fn value_line(assessment: &ValueAssessment) -> Option<String> {
        let direction = match assessment.status {
            ValueStatus::Normal => return None,
            ValueStatus::Low => "below its reference range",
            ValueStatus::High => "above its reference range",
            ValueStatus::CriticalLow => "well below its reference range",
            ValueStatus::CriticalHigh => "well above its reference range",
        };
        let mut line = format!(
            "Your {} value of {} {} is {}.",
            assessment.analyte, assessment.value, assessment.unit, direction
        );
        if assessment.status.is_critical() {
            line.push_str(" Please contact your doctor soon to review it.");
        }
        Some(line)
    }

    /// Qualitative read of the aggregate severity, phrased for the summary.
    pub fn severity_band(aggregate: f64) -> &'static str {
        if aggregate == 0.0 {
            "settled"
        } else if aggregate < 2.0 {
            "mostly settled"
        } else if aggregate < 4.0 {
            "worth a careful look"
        } else {
            "worth prompt review"
        }
    }

    /// One sentence for a trend that crossed out of range or keeps moving
    /// away from it.
    pub fn trend_line(trend: &TrendVerdict) -> String {
        let movement = match trend.direction {
            TrendDirection::Improving => "moving back toward their reference range",
            TrendDirection::Stable => "holding steady outside their reference range",
            TrendDirection::Worsening => "moving away from their reference range",
        };
        format!(
            "Your {} readings have been {} across your last {} reports. \
             This might be worth mentioning at your next appointment.",
            trend.analyte, movement, trend.window
        )
    }

    /// Lifestyle guidance for a built-in condition. General wellness
    /// framing only.
    pub fn condition_tip(condition: &str) -> Option<String> {
        let tip = match condition {
            "anemia" => {
                "Iron-rich foods such as leafy greens, beans, and fortified cereals \
                 can support healthy hemoglobin. Your doctor can advise whether \
                 testing iron levels makes sense."
            }
            "cardiovascular" => {
                "Regular activity and more fibre in your meals can help cholesterol \
                 levels over time. You may want to discuss a follow-up lipid panel \
                 with your doctor."
            }
            "infection" => {
                "Rest and plenty of fluids support your body while white blood cell \
                 counts are elevated. If you feel unwell, please check in with your \
                 doctor."
            }
            _ => return None,
        };
        Some(tip.to_string())
    }

    /// Closing deferral. Every narrative and guidance list ends with it.
    pub fn deferral() -> String {
        "These observations describe reference ranges, not a diagnosis. \
         Please review them with your clinician."
            .to_string()
    }
}

/// Assemble the report narrative: summary, severity band, out-of-range
/// lines, flagged trends, deferral.
pub fn build_narrative(
    assessments: &[ValueAssessment],
    trends: &[TrendVerdict],
    aggregate_severity: f64,
) -> String {
    let abnormal = assessments.iter().filter(|a| !a.status.is_normal()).count();
    let mut lines = vec![NarrativeTemplates::summary_line(assessments.len(), abnormal)];
    if abnormal > 0 || aggregate_severity > 0.0 {
        lines.push(format!(
            "Overall, this report is {}.",
            NarrativeTemplates::severity_band(aggregate_severity)
        ));
    }
    for assessment in assessments {
        if let Some(line) = NarrativeTemplates::value_line(assessment) {
            lines.push(line);
        }
    }
    for trend in trends.iter().filter(|t| t.warning) {
        lines.push(NarrativeTemplates::trend_line(trend));
    }
    lines.push(NarrativeTemplates::deferral());
    lines.join(" ")
}

/// The condition whose guidance a flagged value falls back to when no
/// model is serving.
fn condition_for_flag(assessment: &ValueAssessment) -> Option<&'static str> {
    match (assessment.analyte.as_str(), &assessment.status) {
        ("hemoglobin" | "rbc", ValueStatus::Low | ValueStatus::CriticalLow) => Some("anemia"),
        ("cholesterol" | "ldl" | "triglycerides", ValueStatus::High | ValueStatus::CriticalHigh) => {
            Some("cardiovascular")
        }
        ("hdl", ValueStatus::Low) => Some("cardiovascular"),
        ("wbc", ValueStatus::High | ValueStatus::CriticalHigh) => Some("infection"),
        _ => None,
    }
}

/// Lifestyle guidance: one tip per condition whose risk crossed one-half,
/// falling back to status flags when no prediction is available, always
/// closed by the clinician deferral.
pub fn guidance_lines(
    predictions: &[RiskPrediction],
    assessments: &[ValueAssessment],
) -> Vec<String> {
    let mut conditions: Vec<&str> = predictions
        .iter()
        .filter(|p| p.probability >= 0.5)
        .map(|p| p.condition.as_str())
        .collect();
    if conditions.is_empty() {
        for assessment in assessments {
            if let Some(condition) = condition_for_flag(assessment) {
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
        }
    }

    let mut lines: Vec<String> = conditions
        .iter()
        .filter_map(|c| NarrativeTemplates::condition_tip(c))
        .collect();
    lines.push(NarrativeTemplates::deferral());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendDirection;

    fn assessment(analyte: &str, value: f64, unit: &str, status: ValueStatus) -> ValueAssessment {
        let severity = status.tier_weight();
        ValueAssessment {
            analyte: analyte.to_string(),
            value,
            unit: unit.to_string(),
            status,
            rule_confidence: 0.9,
            model_confidence: None,
            severity,
        }
    }

    fn worsening(analyte: &str) -> TrendVerdict {
        TrendVerdict {
            analyte: analyte.to_string(),
            direction: TrendDirection::Worsening,
            slope: -1.2,
            window: 3,
            warning: true,
        }
    }

    #[test]
    fn narratives_never_contain_alarm_words() {
        let alarm_words = [
            "immediately",
            "urgently",
            "emergency",
            "danger",
            "warning",
            "severe",
            "alarming",
        ];

        let narratives = vec![
            build_narrative(
                &[assessment("hemoglobin", 14.0, "g/dL", ValueStatus::Normal)],
                &[],
                0.0,
            ),
            build_narrative(
                &[
                    assessment("hemoglobin", 9.5, "g/dL", ValueStatus::Low),
                    assessment("wbc", 35.0, "10^9/L", ValueStatus::CriticalHigh),
                ],
                &[worsening("hemoglobin")],
                4.0,
            ),
            guidance_lines(&[], &[assessment("ldl", 160.0, "mg/dL", ValueStatus::High)]).join(" "),
        ];

        for narrative in &narratives {
            let lower = narrative.to_lowercase();
            for word in &alarm_words {
                assert!(
                    !lower.contains(word),
                    "Narrative contains alarm word '{}': {}",
                    word,
                    narrative,
                );
            }
        }
    }

    #[test]
    fn normal_report_reads_quietly() {
        let narrative = build_narrative(
            &[
                assessment("hemoglobin", 14.0, "g/dL", ValueStatus::Normal),
                assessment("wbc", 6.0, "10^9/L", ValueStatus::Normal),
            ],
            &[],
            0.0,
        );
        assert!(narrative.starts_with("All 2 measured values"));
        assert!(narrative.contains("not a diagnosis"));
        assert!(!narrative.contains("Your hemoglobin"));
        assert!(!narrative.contains("Overall"), "settled reports skip the band line");
    }

    #[test]
    fn critical_value_asks_for_prompt_contact() {
        let narrative = build_narrative(
            &[assessment("hemoglobin", 6.5, "g/dL", ValueStatus::CriticalLow)],
            &[],
            3.0,
        );
        assert!(narrative.contains("well below its reference range"));
        assert!(narrative.contains("contact your doctor soon"));
        assert!(narrative.contains("worth a careful look"));
    }

    #[test]
    fn flagged_trend_gets_a_line() {
        let narrative = build_narrative(
            &[assessment("hemoglobin", 9.5, "g/dL", ValueStatus::Low)],
            &[worsening("hemoglobin")],
            1.0,
        );
        assert!(narrative.contains("moving away from their reference range"));
        assert!(narrative.contains("last 3 reports"));
    }

    #[test]
    fn severity_band_scales_with_aggregate() {
        assert_eq!(NarrativeTemplates::severity_band(0.0), "settled");
        assert_eq!(NarrativeTemplates::severity_band(1.2), "mostly settled");
        assert_eq!(NarrativeTemplates::severity_band(3.0), "worth a careful look");
        assert_eq!(NarrativeTemplates::severity_band(6.5), "worth prompt review");
    }

    #[test]
    fn value_line_is_none_for_normal() {
        let normal = assessment("hdl", 50.0, "mg/dL", ValueStatus::Normal);
        assert!(NarrativeTemplates::value_line(&normal).is_none());
    }

    #[test]
    fn empty_report_gets_its_own_summary() {
        let narrative = build_narrative(&[], &[], 0.0);
        assert!(narrative.starts_with("No recognized values"));
        assert!(narrative.contains("clinician"));
    }

    #[test]
    fn guidance_prefers_predictions() {
        let prediction = RiskPrediction {
            condition: "anemia".to_string(),
            probability: 0.8,
            model_version: 1,
            baseline: 0.0,
            attributions: vec![],
        };
        let lines = guidance_lines(&[prediction], &[]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Iron-rich foods"));
        assert!(lines[1].contains("clinician"));
    }

    #[test]
    fn low_risk_prediction_yields_no_tip() {
        let prediction = RiskPrediction {
            condition: "anemia".to_string(),
            probability: 0.2,
            model_version: 1,
            baseline: 0.0,
            attributions: vec![],
        };
        let lines = guidance_lines(&[prediction], &[]);
        assert_eq!(lines.len(), 1, "only the deferral should remain");
    }

    #[test]
    fn guidance_falls_back_to_status_flags() {
        let flagged = [
            assessment("ldl", 160.0, "mg/dL", ValueStatus::High),
            assessment("cholesterol", 240.0, "mg/dL", ValueStatus::High),
        ];
        let lines = guidance_lines(&[], &flagged);
        // Both flags map to the same condition; the tip appears once.
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("lipid panel"));
    }
}
