use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

use super::analyte::SubjectProfile;
use super::enums::Sex;

/// A low/high pair overriding the default band for one sex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

/// Authoritative reference interval for one analyte, in its canonical unit.
///
/// `low..=high` is the normal band (both boundaries inclusive). Critical
/// fences are optional; without them the scale collapses to low/normal/high.
/// `unit_aliases` maps alternative unit spellings to the multiplicative
/// factor that converts a value in that unit into the canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub analyte: String,
    pub unit: String,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub critical_low: Option<f64>,
    #[serde(default)]
    pub critical_high: Option<f64>,
    #[serde(default)]
    pub unit_aliases: HashMap<String, f64>,
    #[serde(default)]
    pub female: Option<Band>,
    #[serde(default)]
    pub male: Option<Band>,
}

impl ReferenceRange {
    /// Structural validation, run once at table load. Every violation names
    /// the analyte so a bad config line is findable.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |reason: &str| {
            Err(EngineError::InvalidRange {
                analyte: self.analyte.clone(),
                reason: reason.to_string(),
            })
        };

        if !(self.low.is_finite() && self.high.is_finite()) {
            return fail("bounds must be finite");
        }
        if self.low >= self.high {
            return fail("low bound must be below high bound");
        }
        if let Some(cl) = self.critical_low {
            if !cl.is_finite() || cl >= self.low {
                return fail("critical_low must be finite and below low");
            }
        }
        if let Some(ch) = self.critical_high {
            if !ch.is_finite() || ch <= self.high {
                return fail("critical_high must be finite and above high");
            }
        }
        for band in [&self.female, &self.male].into_iter().flatten() {
            if !(band.low.is_finite() && band.high.is_finite()) || band.low >= band.high {
                return fail("sex-specific band must be a finite low < high pair");
            }
        }
        for (alias, factor) in &self.unit_aliases {
            if !factor.is_finite() || *factor <= 0.0 {
                return fail(&format!("alias '{alias}' needs a positive finite factor"));
            }
        }
        Ok(())
    }

    /// Effective normal band for a subject: the sex-specific override when
    /// one is configured, the default band otherwise.
    pub fn band_for(&self, profile: &SubjectProfile) -> (f64, f64) {
        let band = match profile.sex {
            Some(Sex::Female) => self.female.as_ref(),
            Some(Sex::Male) => self.male.as_ref(),
            None => None,
        };
        match band {
            Some(b) => (b.low, b.high),
            None => (self.low, self.high),
        }
    }

    /// Midpoint of the effective normal band. Used as the trend anchor and
    /// as the deterministic imputation for missing feature values.
    pub fn midpoint(&self, profile: &SubjectProfile) -> f64 {
        let (low, high) = self.band_for(profile);
        (low + high) / 2.0
    }
}
