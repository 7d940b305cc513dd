use std::collections::HashMap;
use std::path::Path;

use crate::config::ConfigError;
use crate::models::{AnalyteValue, Band, ReferenceRange};

use super::types::EngineError;

/// Authoritative analyte → reference range lookup.
///
/// Unknown analytes are always an error, never a guessed default; the table
/// is the single place unit normalization happens.
#[derive(Debug)]
pub struct ReferenceRangeTable {
    ranges: HashMap<String, ReferenceRange>,
}

impl ReferenceRangeTable {
    /// Build a table from ranges, validating each and rejecting duplicates.
    pub fn from_ranges(ranges: Vec<ReferenceRange>) -> Result<Self, EngineError> {
        let mut map = HashMap::with_capacity(ranges.len());
        for range in ranges {
            range.validate()?;
            let key = range.analyte.to_lowercase();
            if map.insert(key, range.clone()).is_some() {
                return Err(EngineError::InvalidRange {
                    analyte: range.analyte,
                    reason: "duplicate analyte in reference table".into(),
                });
            }
        }
        Ok(Self { ranges: map })
    }

    /// Load a table from a JSON file (an array of ranges).
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let ranges: Vec<ReferenceRange> = serde_json::from_str(&raw).map_err(ConfigError::Parse)?;
        Self::from_ranges(ranges)
    }

    /// The compiled-in default panel. Bounds are standard adult reference
    /// intervals; critical fences only where a clinically meaningful one
    /// exists.
    pub fn load_builtin() -> Self {
        // Builtin data is validated by construction; from_ranges cannot fail
        // on it (covered by a test below).
        Self {
            ranges: builtin_ranges()
                .into_iter()
                .map(|r| (r.analyte.clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, analyte: &str) -> Result<&ReferenceRange, EngineError> {
        self.ranges
            .get(&analyte.to_lowercase())
            .ok_or_else(|| EngineError::UnknownAnalyte {
                analyte: analyte.to_string(),
            })
    }

    pub fn contains(&self, analyte: &str) -> bool {
        self.ranges.contains_key(&analyte.to_lowercase())
    }

    pub fn analytes(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    /// Validate a raw value and convert it into the analyte's canonical unit.
    ///
    /// Unit matching is case-insensitive; anything not canonical and not in
    /// the alias table is a hard error — the engine never guesses a factor.
    pub fn normalize(&self, value: &AnalyteValue) -> Result<f64, EngineError> {
        let range = self.get(&value.analyte)?;

        if !value.value.is_finite() || value.value < 0.0 {
            return Err(EngineError::InvalidValue {
                analyte: value.analyte.clone(),
                value: value.value,
            });
        }

        let unit = value.unit.to_lowercase();
        if unit == range.unit.to_lowercase() {
            return Ok(value.value);
        }
        for (alias, factor) in &range.unit_aliases {
            if unit == alias.to_lowercase() {
                return Ok(value.value * factor);
            }
        }
        Err(EngineError::UnitMismatch {
            analyte: value.analyte.clone(),
            unit: value.unit.clone(),
            expected: range.unit.clone(),
        })
    }
}

fn builtin_ranges() -> Vec<ReferenceRange> {
    vec![
        ReferenceRange {
            analyte: "hemoglobin".into(),
            unit: "g/dL".into(),
            low: 12.0,
            high: 15.5,
            critical_low: Some(7.0),
            critical_high: Some(20.0),
            unit_aliases: HashMap::from([("g/L".into(), 0.1)]),
            female: Some(Band { low: 12.0, high: 15.5 }),
            male: Some(Band { low: 13.0, high: 17.5 }),
        },
        ReferenceRange {
            analyte: "wbc".into(),
            unit: "10^9/L".into(),
            low: 4.0,
            high: 11.0,
            critical_low: Some(1.0),
            critical_high: Some(30.0),
            unit_aliases: HashMap::from([("10^3/uL".into(), 1.0), ("K/uL".into(), 1.0)]),
            female: None,
            male: None,
        },
        ReferenceRange {
            analyte: "rbc".into(),
            unit: "10^12/L".into(),
            low: 4.2,
            high: 5.4,
            critical_low: None,
            critical_high: None,
            unit_aliases: HashMap::from([("M/uL".into(), 1.0)]),
            female: None,
            male: Some(Band { low: 4.7, high: 6.1 }),
        },
        ReferenceRange {
            analyte: "platelets".into(),
            unit: "10^9/L".into(),
            low: 150.0,
            high: 450.0,
            critical_low: Some(50.0),
            critical_high: Some(1000.0),
            unit_aliases: HashMap::from([("10^3/uL".into(), 1.0), ("K/uL".into(), 1.0)]),
            female: None,
            male: None,
        },
        ReferenceRange {
            analyte: "cholesterol".into(),
            unit: "mg/dL".into(),
            low: 125.0,
            high: 200.0,
            critical_low: None,
            critical_high: Some(300.0),
            unit_aliases: HashMap::from([("mmol/L".into(), 38.67)]),
            female: None,
            male: None,
        },
        ReferenceRange {
            analyte: "hdl".into(),
            unit: "mg/dL".into(),
            low: 40.0,
            high: 60.0,
            critical_low: None,
            critical_high: None,
            unit_aliases: HashMap::from([("mmol/L".into(), 38.67)]),
            female: None,
            male: None,
        },
        ReferenceRange {
            analyte: "ldl".into(),
            unit: "mg/dL".into(),
            low: 0.0,
            high: 130.0,
            critical_low: None,
            critical_high: Some(190.0),
            unit_aliases: HashMap::from([("mmol/L".into(), 38.67)]),
            female: None,
            male: None,
        },
        ReferenceRange {
            analyte: "triglycerides".into(),
            unit: "mg/dL".into(),
            low: 0.0,
            high: 150.0,
            critical_low: None,
            critical_high: Some(500.0),
            unit_aliases: HashMap::from([("mmol/L".into(), 88.57)]),
            female: None,
            male: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_structurally_valid() {
        // load_builtin skips from_ranges; prove the data would pass it.
        let table = ReferenceRangeTable::from_ranges(builtin_ranges()).unwrap();
        for analyte in [
            "hemoglobin",
            "wbc",
            "rbc",
            "platelets",
            "cholesterol",
            "hdl",
            "ldl",
            "triglycerides",
        ] {
            assert!(table.contains(analyte), "missing builtin analyte {analyte}");
        }
    }

    #[test]
    fn unknown_analyte_is_an_error() {
        let table = ReferenceRangeTable::load_builtin();
        let err = table.get("ferritin").unwrap_err();
        assert!(matches!(err, EngineError::UnknownAnalyte { ref analyte } if analyte == "ferritin"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = ReferenceRangeTable::load_builtin();
        assert!(table.get("Hemoglobin").is_ok());
        assert!(table.get("WBC").is_ok());
    }

    #[test]
    fn canonical_unit_passes_through() {
        let table = ReferenceRangeTable::load_builtin();
        let v = AnalyteValue::new("hemoglobin", 13.2, "g/dL");
        assert_eq!(table.normalize(&v).unwrap(), 13.2);
    }

    #[test]
    fn alias_unit_converts_by_factor() {
        let table = ReferenceRangeTable::load_builtin();
        let v = AnalyteValue::new("hemoglobin", 132.0, "g/L");
        assert!((table.normalize(&v).unwrap() - 13.2).abs() < 1e-9);

        let v = AnalyteValue::new("cholesterol", 5.2, "mmol/L");
        assert!((table.normalize(&v).unwrap() - 201.084).abs() < 1e-6);
    }

    #[test]
    fn unrecognized_unit_is_a_mismatch_not_a_guess() {
        let table = ReferenceRangeTable::load_builtin();
        let v = AnalyteValue::new("hemoglobin", 13.2, "mmol/L");
        let err = table.normalize(&v).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnitMismatch { ref expected, .. } if expected == "g/dL"
        ));
    }

    #[test]
    fn non_finite_or_negative_value_rejected() {
        let table = ReferenceRangeTable::load_builtin();
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let v = AnalyteValue::new("wbc", bad, "10^9/L");
            assert!(
                matches!(table.normalize(&v), Err(EngineError::InvalidValue { .. })),
                "value {bad} should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_analyte_rejected_at_build() {
        let mut ranges = builtin_ranges();
        ranges.push(ranges[0].clone());
        let err = ReferenceRangeTable::from_ranges(ranges).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn table_round_trips_through_json_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&builtin_ranges()).unwrap();
        std::fs::write(file.path(), json).unwrap();

        let table = ReferenceRangeTable::load(file.path()).unwrap();
        assert!(table.contains("ldl"));
        assert_eq!(table.get("ldl").unwrap().critical_high, Some(190.0));
    }

    #[test]
    fn malformed_json_surfaces_parse_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();
        assert!(matches!(
            ReferenceRangeTable::load(file.path()),
            Err(EngineError::Config(_))
        ));
    }
}
