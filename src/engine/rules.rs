use crate::config::EngineConfig;
use crate::models::{ReferenceRange, SubjectProfile, ValueStatus};

/// Output of the threshold classifier for one canonical value.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    pub status: ValueStatus,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Threshold classification
// ---------------------------------------------------------------------------

/// Classify a canonical-unit value against its effective reference band.
///
/// The normal band is inclusive at both ends: `v == low` and `v == high` are
/// Normal. Critical fences, when configured, carve CriticalLow/CriticalHigh
/// off the outer ends; without them the scale is Low/Normal/High only.
pub fn classify(
    value: f64,
    range: &ReferenceRange,
    profile: &SubjectProfile,
    config: &EngineConfig,
) -> RuleVerdict {
    let (low, high) = range.band_for(profile);

    let status = if range.critical_low.is_some_and(|cl| value < cl) {
        ValueStatus::CriticalLow
    } else if value < low {
        ValueStatus::Low
    } else if value <= high {
        ValueStatus::Normal
    } else if range.critical_high.map_or(true, |ch| value <= ch) {
        ValueStatus::High
    } else {
        ValueStatus::CriticalHigh
    };

    let confidence = boundary_confidence(value, range, low, high, config);
    RuleVerdict { status, confidence }
}

/// Confidence in the threshold verdict: 1.0 deep inside a band, decaying
/// linearly to the configured floor as the value nears its closest boundary.
///
/// The epsilon band width is a fraction of the normal band width, so the
/// same config value behaves sensibly across analytes with different units.
fn boundary_confidence(
    value: f64,
    range: &ReferenceRange,
    low: f64,
    high: f64,
    config: &EngineConfig,
) -> f64 {
    let band = config.boundary_epsilon_fraction * (high - low);
    if band <= 0.0 {
        return 1.0;
    }

    let mut boundaries = vec![low, high];
    if let Some(cl) = range.critical_low {
        boundaries.push(cl);
    }
    if let Some(ch) = range.critical_high {
        boundaries.push(ch);
    }

    let nearest = boundaries
        .iter()
        .map(|b| (value - b).abs())
        .fold(f64::INFINITY, f64::min);

    if nearest >= band {
        return 1.0;
    }
    let floor = config.rule_confidence_floor;
    (floor + (1.0 - floor) * (nearest / band)).clamp(floor, 1.0)
}
