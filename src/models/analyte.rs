use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Sex;

/// One measured value as it arrives from the ingestion layer.
///
/// The analyte name is canonical lowercase ("hemoglobin", "ldl"); the unit is
/// whatever the source report printed and gets normalized against the
/// reference table before any classification happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyteValue {
    pub analyte: String,
    pub value: f64,
    pub unit: String,
}

impl AnalyteValue {
    pub fn new(analyte: &str, value: f64, unit: &str) -> Self {
        Self {
            analyte: analyte.trim().to_lowercase(),
            value,
            unit: unit.trim().to_string(),
        }
    }
}

/// Optional demographics used for sex-specific reference bands and as a
/// model feature. Absent fields fall back to the unadjusted defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectProfile {
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub age_years: Option<f64>,
}

/// A fully parsed lab report, ready for scoring. The id is assigned once at
/// construction so re-scoring the same report is byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedReport {
    pub report_id: Uuid,
    pub subject_id: String,
    pub taken_at: NaiveDateTime,
    /// Keyed by canonical analyte name; BTreeMap keeps iteration ordered.
    pub values: BTreeMap<String, AnalyteValue>,
}

impl ParsedReport {
    pub fn new(subject_id: &str, taken_at: NaiveDateTime, values: Vec<AnalyteValue>) -> Self {
        let values = values
            .into_iter()
            .map(|v| (v.analyte.clone(), v))
            .collect();
        Self {
            report_id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            taken_at,
            values,
        }
    }

    pub fn value(&self, analyte: &str) -> Option<&AnalyteValue> {
        self.values.get(analyte)
    }
}
