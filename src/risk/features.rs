use std::collections::{BTreeMap, HashMap};

use crate::config::ConditionSpec;
use crate::engine::{EngineError, ReferenceRangeTable};
use crate::models::SubjectProfile;

/// Neutral adult age when the profile gives none.
const DEFAULT_AGE_YEARS: f64 = 45.0;

/// Everything feature assembly reads, fetched ahead of time so the assembly
/// itself is pure: current canonical values, per-analyte trend slopes, and
/// the subject's demographics.
pub struct FeatureSnapshot<'a> {
    pub values: &'a BTreeMap<String, f64>,
    pub slopes: &'a HashMap<String, f64>,
    pub profile: &'a SubjectProfile,
}

/// A named feature vector in the order the condition spec declares.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

/// Assemble the feature vector for one condition.
///
/// Missing analyte values impute the reference-band midpoint — deterministic
/// and unit-consistent, so one absent marker never blocks a prediction.
/// Missing slopes impute 0.0 (no observed movement).
pub fn assemble(
    spec: &ConditionSpec,
    snapshot: &FeatureSnapshot,
    table: &ReferenceRangeTable,
) -> Result<FeatureVector, EngineError> {
    let mut values = Vec::with_capacity(spec.feature_names().len());

    for analyte in &spec.value_features {
        let value = match snapshot.values.get(analyte) {
            Some(v) => *v,
            None => table.get(analyte)?.midpoint(snapshot.profile),
        };
        values.push(value);
    }
    for analyte in &spec.slope_features {
        values.push(snapshot.slopes.get(analyte).copied().unwrap_or(0.0));
    }
    if spec.use_age {
        values.push(snapshot.profile.age_years.unwrap_or(DEFAULT_AGE_YEARS));
    }

    Ok(FeatureVector {
        names: spec.feature_names(),
        values,
    })
}
