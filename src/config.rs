use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ModelKind, SeverityPolicy};

/// Engine-level constants
pub const ENGINE_NAME: &str = "Clariva";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "clariva=info".to_string()
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the whole engine. `Default` is the documented baseline;
/// hosts override via a JSON file. Unknown analytes in condition feature
/// lists are caught when the engine is constructed against a reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width of the boundary uncertainty band, as a fraction of the normal
    /// band width (default: 0.05).
    pub boundary_epsilon_fraction: f64,
    /// Rule confidence at a boundary itself; decay is linear from 1.0 across
    /// the epsilon band down to this floor (default: 0.5).
    pub rule_confidence_floor: f64,
    /// How per-value severities roll up into the report's aggregate.
    pub severity_policy: SeverityPolicy,
    pub trend: TrendConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Most recent reports (containing the analyte) considered (default: 3).
    pub window: usize,
    /// Slope magnitudes at or below this count as stable (default: 0.5).
    pub slope_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Training refuses smaller datasets (default: 30).
    pub min_training_examples: usize,
    /// Gradient-descent iteration cap (default: 500).
    pub max_iterations: usize,
    pub learning_rate: f64,
    /// Wall-clock training budget; exhausting it mid-descent is an error,
    /// not a silently worse model (default: 5000).
    pub time_budget_ms: u64,
    /// Share of examples held out for the AUC estimate (default: 0.2).
    pub holdout_fraction: f64,
    /// Seed for the holdout shuffle and weight init, so retraining on the
    /// same data reproduces the same artifact (default: 42).
    pub seed: u64,
    pub conditions: Vec<ConditionSpec>,
}

/// Declarative feature recipe for one condition model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub name: String,
    pub model_kind: ModelKind,
    /// Analytes whose latest canonical values become features, in order.
    pub value_features: Vec<String>,
    /// Analytes whose trend slopes become features, named `<analyte>_slope`.
    #[serde(default)]
    pub slope_features: Vec<String>,
    /// Append the subject's age as the final feature.
    #[serde(default)]
    pub use_age: bool,
}

impl ConditionSpec {
    /// Feature names in vector order: values, then slopes, then age.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.value_features.clone();
        names.extend(self.slope_features.iter().map(|a| format!("{a}_slope")));
        if self.use_age {
            names.push("age".to_string());
        }
        names
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 3,
            slope_threshold: 0.5,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_training_examples: 30,
            max_iterations: 500,
            learning_rate: 0.1,
            time_budget_ms: 5_000,
            holdout_fraction: 0.2,
            seed: 42,
            conditions: default_conditions(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boundary_epsilon_fraction: 0.05,
            rule_confidence_floor: 0.5,
            severity_policy: SeverityPolicy::Sum,
            trend: TrendConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

/// The shipped condition panel. Feature lists mirror the markers each
/// condition is clinically read from; infection uses a stump because its
/// signal is a single sharp threshold rather than a weighted combination.
pub fn default_conditions() -> Vec<ConditionSpec> {
    vec![
        ConditionSpec {
            name: "anemia".into(),
            model_kind: ModelKind::Logistic,
            value_features: vec!["hemoglobin".into(), "rbc".into(), "platelets".into()],
            slope_features: vec!["hemoglobin".into()],
            use_age: true,
        },
        ConditionSpec {
            name: "cardiovascular".into(),
            model_kind: ModelKind::Logistic,
            value_features: vec![
                "cholesterol".into(),
                "hdl".into(),
                "ldl".into(),
                "triglycerides".into(),
            ],
            slope_features: vec!["ldl".into()],
            use_age: true,
        },
        ConditionSpec {
            name: "infection".into(),
            model_kind: ModelKind::Stump,
            value_features: vec!["wbc".into(), "platelets".into()],
            slope_features: vec!["wbc".into()],
            use_age: false,
        },
    ]
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::Invalid { reason });

        if !(self.boundary_epsilon_fraction > 0.0 && self.boundary_epsilon_fraction <= 0.5) {
            return fail(format!(
                "boundary_epsilon_fraction {} outside (0, 0.5]",
                self.boundary_epsilon_fraction
            ));
        }
        if !(self.rule_confidence_floor > 0.0 && self.rule_confidence_floor <= 1.0) {
            return fail(format!(
                "rule_confidence_floor {} outside (0, 1]",
                self.rule_confidence_floor
            ));
        }
        if self.trend.window < 2 {
            return fail(format!("trend window {} below 2", self.trend.window));
        }
        if !(self.trend.slope_threshold.is_finite() && self.trend.slope_threshold >= 0.0) {
            return fail("trend slope_threshold must be finite and non-negative".into());
        }
        if self.risk.min_training_examples < 2 {
            return fail("min_training_examples below 2".into());
        }
        if self.risk.max_iterations == 0 {
            return fail("max_iterations must be at least 1".into());
        }
        if !(self.risk.learning_rate.is_finite() && self.risk.learning_rate > 0.0) {
            return fail("learning_rate must be finite and positive".into());
        }
        if !(self.risk.holdout_fraction > 0.0 && self.risk.holdout_fraction <= 0.5) {
            return fail(format!(
                "holdout_fraction {} outside (0, 0.5]",
                self.risk.holdout_fraction
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.risk.conditions {
            if spec.name.trim().is_empty() {
                return fail("condition with empty name".into());
            }
            if !seen.insert(spec.name.clone()) {
                return fail(format!("duplicate condition '{}'", spec.name));
            }
            if spec.feature_names().is_empty() {
                return fail(format!("condition '{}' has no features", spec.name));
            }
        }
        Ok(())
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionSpec> {
        self.risk.conditions.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trend.window, 3);
        assert_eq!(config.risk.min_training_examples, 30);
        assert_eq!(config.risk.conditions.len(), 3);
    }

    #[test]
    fn feature_names_follow_declaration_order() {
        let config = EngineConfig::default();
        let anemia = config.condition("anemia").unwrap();
        assert_eq!(
            anemia.feature_names(),
            vec!["hemoglobin", "rbc", "platelets", "hemoglobin_slope", "age"]
        );
        let infection = config.condition("infection").unwrap();
        assert_eq!(infection.feature_names(), vec!["wbc", "platelets", "wbc_slope"]);
    }

    #[test]
    fn empty_json_loads_full_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.boundary_epsilon_fraction, 0.05);
        assert_eq!(config.risk.seed, 42);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"trend": {{"window": 5}}}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.trend.window, 5);
        assert_eq!(config.trend.slope_threshold, 0.5);
    }

    #[test]
    fn bad_epsilon_rejected() {
        let mut config = EngineConfig::default();
        config.boundary_epsilon_fraction = 0.0;
        assert!(config.validate().is_err());
        config.boundary_epsilon_fraction = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_condition_rejected() {
        let mut config = EngineConfig::default();
        let dup = config.risk.conditions[0].clone();
        config.risk.conditions.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("anemia"));
    }

    #[test]
    fn narrow_window_rejected() {
        let mut config = EngineConfig::default();
        config.trend.window = 1;
        assert!(config.validate().is_err());
    }
}
