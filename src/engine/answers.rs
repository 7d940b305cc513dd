//! Plain-language questions over a scored report.
//!
//! Keyword matching only: answers are assembled from the outcome the engine
//! already computed, never generated beyond the calm templates. Anything the
//! matcher does not recognize gets the generic deferral.

use crate::models::{ReportOutcome, RiskPrediction, ValueAssessment};

use super::narrative::NarrativeTemplates;

/// Lay phrasings mapped to canonical analyte names, most specific first so
/// "bad cholesterol" resolves to ldl before the plain cholesterol match.
const ANALYTE_SYNONYMS: &[(&str, &str)] = &[
    ("bad cholesterol", "ldl"),
    ("good cholesterol", "hdl"),
    ("haemoglobin", "hemoglobin"),
    ("hgb", "hemoglobin"),
    ("white blood", "wbc"),
    ("white cell", "wbc"),
    ("leukocyte", "wbc"),
    ("red blood", "rbc"),
    ("red cell", "rbc"),
    ("erythrocyte", "rbc"),
    ("thrombocyte", "platelets"),
    ("platelet", "platelets"),
    ("triglyceride", "triglycerides"),
    ("ldl", "ldl"),
    ("hdl", "hdl"),
];

const CONDITION_SYNONYMS: &[(&str, &str)] = &[
    ("anaemia", "anemia"),
    ("anemia", "anemia"),
    ("cardio", "cardiovascular"),
    ("heart", "cardiovascular"),
    ("infection", "infection"),
];

const RISK_WORDS: &[&str] = &["risk", "chance", "likely", "probability"];
const TREND_WORDS: &[&str] = &[
    "trend",
    "changing",
    "better",
    "worse",
    "improving",
    "direction",
];

/// Answer a free-form question from the outcome. Every answer closes with
/// the clinician deferral.
pub fn answer_question(question: &str, outcome: &ReportOutcome) -> String {
    let q = question.to_lowercase();
    let body = analyte_answer(&q, outcome)
        .or_else(|| risk_answer(&q, outcome))
        .or_else(|| trend_answer(&q, outcome))
        .unwrap_or_else(|| {
            "I can answer questions about the values, trends, and risk signals \
             in this report."
                .to_string()
        });
    format!("{} {}", body, NarrativeTemplates::deferral())
}

fn matched_analyte(q: &str, outcome: &ReportOutcome) -> Option<String> {
    for (keyword, analyte) in ANALYTE_SYNONYMS {
        if q.contains(keyword) && outcome.score.assessment(analyte).is_some() {
            return Some((*analyte).to_string());
        }
    }
    outcome
        .score
        .assessments
        .iter()
        .map(|a| &a.analyte)
        .find(|name| q.contains(name.as_str()))
        .cloned()
}

fn describe_value(assessment: &ValueAssessment) -> String {
    match NarrativeTemplates::value_line(assessment) {
        Some(line) => line,
        None => format!(
            "Your {} value of {} {} sits within its reference range.",
            assessment.analyte, assessment.value, assessment.unit
        ),
    }
}

fn analyte_answer(q: &str, outcome: &ReportOutcome) -> Option<String> {
    let analyte = matched_analyte(q, outcome)?;
    let assessment = outcome.score.assessment(&analyte)?;
    let mut answer = describe_value(assessment);
    if let Some(trend) = outcome.trend(&analyte) {
        if trend.warning {
            answer.push(' ');
            answer.push_str(&NarrativeTemplates::trend_line(trend));
        }
    }
    Some(answer)
}

fn influence_phrase(feature: &str) -> String {
    match feature.strip_suffix("_slope") {
        Some(analyte) => format!("recent {} trend", analyte),
        None if feature == "age" => "age".to_string(),
        None => format!("{} reading", feature),
    }
}

fn prediction_line(prediction: &RiskPrediction) -> String {
    let mut line = format!(
        "The {} model (version {}) reads this report's risk signal at {:.0}%.",
        prediction.condition,
        prediction.model_version,
        prediction.probability * 100.0
    );
    if let Some((feature, _)) = prediction.top_influence() {
        line.push_str(&format!(
            " The strongest influence was your {}.",
            influence_phrase(feature)
        ));
    }
    line
}

fn named_condition(q: &str) -> Option<&'static str> {
    CONDITION_SYNONYMS
        .iter()
        .find(|(keyword, _)| q.contains(keyword))
        .map(|(_, condition)| *condition)
}

fn risk_answer(q: &str, outcome: &ReportOutcome) -> Option<String> {
    if !RISK_WORDS.iter().any(|w| q.contains(w)) {
        return None;
    }
    let named = named_condition(q);
    let lines: Vec<String> = outcome
        .predictions
        .iter()
        .filter(|p| named.map_or(true, |n| n == p.condition))
        .map(prediction_line)
        .collect();
    if !lines.is_empty() {
        return Some(lines.join(" "));
    }
    if let Some(name) = named {
        if let Some(skipped) = outcome.skipped.iter().find(|s| s.condition == name) {
            return Some(format!(
                "No {} signal is available for this report: {}.",
                skipped.condition, skipped.reason
            ));
        }
        return Some(format!("No {} signal was computed for this report.", name));
    }
    Some("No risk models were available for this report.".to_string())
}

fn trend_answer(q: &str, outcome: &ReportOutcome) -> Option<String> {
    if !TREND_WORDS.iter().any(|w| q.contains(w)) {
        return None;
    }
    let flagged: Vec<String> = outcome
        .trends
        .iter()
        .filter(|t| t.warning)
        .map(NarrativeTemplates::trend_line)
        .collect();
    if flagged.is_empty() {
        Some("Your tracked values have held steady across your recent reports.".to_string())
    } else {
        Some(flagged.join(" "))
    }
}
