use serde::{Deserialize, Serialize};

use super::enums::TrendDirection;

/// Longitudinal verdict for one analyte over its recent window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendVerdict {
    pub analyte: String,
    pub direction: TrendDirection,
    /// Least-squares slope of value over observation index, in canonical
    /// units per report.
    pub slope: f64,
    /// Number of points the verdict actually used (may be smaller than the
    /// configured window when the history is short).
    pub window: usize,
    /// Early-warning flag: worsening into abnormal territory, or a fresh
    /// normal-to-abnormal inflection.
    pub warning: bool,
}

impl TrendVerdict {
    /// The no-signal verdict for series too short to regress.
    pub fn stable(analyte: &str, window: usize) -> Self {
        Self {
            analyte: analyte.to_string(),
            direction: TrendDirection::Stable,
            slope: 0.0,
            window,
            warning: false,
        }
    }
}
