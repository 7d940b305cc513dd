//! Longitudinal trend analysis: least-squares slope over an analyte's recent
//! window, direction relative to the normal-band midpoint, and the
//! early-warning flag.
//!
//! Everything here is pure over pre-fetched points so the history layer and
//! the math stay independently testable.

use crate::config::TrendConfig;
use crate::models::{TrendDirection, TrendVerdict, ValueStatus};

/// One observation in an analyte's series, oldest-first.
#[derive(Debug, Clone)]
pub struct TrendPoint {
    pub value: f64,
    pub status: ValueStatus,
}

/// Least-squares slope of `series` against its index (0, 1, 2, ...).
/// Series shorter than 2 have no slope.
pub fn linear_slope(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = series.iter().sum();
    let sum_xy: f64 = series.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();

    let denom = nf * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (nf * sum_xy - sum_x * sum_y) / denom
}

/// Evaluate one analyte's trend from its windowed points (oldest-first).
///
/// Direction needs both a slope above the stability threshold and movement
/// relative to the band midpoint: away from it is Worsening, toward it is
/// Improving. The warning flag fires on a worsening abnormal latest value,
/// or on a fresh Normal → abnormal inflection across the last two points
/// regardless of slope.
pub fn assess_trend(
    analyte: &str,
    points: &[TrendPoint],
    band_midpoint: f64,
    config: &TrendConfig,
) -> TrendVerdict {
    let n = points.len();
    if n < 2 {
        return TrendVerdict::stable(analyte, n);
    }

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let slope = linear_slope(&values);
    let latest = &points[n - 1];

    let direction = if slope.abs() <= config.slope_threshold {
        TrendDirection::Stable
    } else {
        let moving_away = (slope > 0.0 && latest.value > band_midpoint)
            || (slope < 0.0 && latest.value < band_midpoint);
        if moving_away {
            TrendDirection::Worsening
        } else {
            TrendDirection::Improving
        }
    };

    let inflected = points[n - 2].status.is_normal() && !latest.status.is_normal();
    let warning = (direction == TrendDirection::Worsening && !latest.status.is_normal())
        || inflected;

    TrendVerdict {
        analyte: analyte.to_string(),
        direction,
        slope,
        window: n,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(series: &[(f64, ValueStatus)]) -> Vec<TrendPoint> {
        series
            .iter()
            .map(|(value, status)| TrendPoint {
                value: *value,
                status: status.clone(),
            })
            .collect()
    }

    const HGB_MIDPOINT: f64 = 13.75;

    #[test]
    fn slope_of_linear_series_is_exact() {
        assert!((linear_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-12);
        assert!((linear_slope(&[10.0, 8.0, 6.0]) + 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[5.0]), 0.0);
        assert_eq!(linear_slope(&[]), 0.0);
    }

    #[test]
    fn fewer_than_two_points_is_stable_without_warning() {
        let config = TrendConfig::default();
        let single = points(&[(9.5, ValueStatus::Low)]);
        let verdict = assess_trend("hemoglobin", &single, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Stable);
        assert!(!verdict.warning);
        assert_eq!(verdict.slope, 0.0);
        assert_eq!(verdict.window, 1);

        let none = assess_trend("hemoglobin", &[], HGB_MIDPOINT, &config);
        assert_eq!(none.direction, TrendDirection::Stable);
        assert!(!none.warning);
    }

    /// Falling hemoglobin 14.0 → 12.0 → 9.5 must worsen and warn.
    #[test]
    fn falling_hemoglobin_worsens_and_warns() {
        let config = TrendConfig::default();
        let series = points(&[
            (14.0, ValueStatus::Normal),
            (12.0, ValueStatus::Normal),
            (9.5, ValueStatus::Low),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Worsening);
        assert!(verdict.warning);
        assert!((verdict.slope + 2.25).abs() < 1e-9);
        assert_eq!(verdict.window, 3);
    }

    #[test]
    fn rising_toward_midpoint_is_improving() {
        let config = TrendConfig::default();
        let series = points(&[
            (9.5, ValueStatus::Low),
            (11.0, ValueStatus::Low),
            (12.5, ValueStatus::Normal),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Improving);
        assert!(!verdict.warning);
    }

    #[test]
    fn rising_away_from_midpoint_is_worsening() {
        let config = TrendConfig::default();
        let series = points(&[
            (15.0, ValueStatus::Normal),
            (16.5, ValueStatus::High),
            (18.0, ValueStatus::High),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Worsening);
        assert!(verdict.warning);
    }

    #[test]
    fn worsening_inside_the_normal_band_does_not_warn() {
        let config = TrendConfig::default();
        let series = points(&[
            (15.5, ValueStatus::Normal),
            (14.5, ValueStatus::Normal),
            (13.0, ValueStatus::Normal),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Worsening);
        assert!(!verdict.warning, "all-normal series must not warn");
    }

    /// A fresh Normal → abnormal crossing warns even when the regression
    /// slope is too shallow to call a direction.
    #[test]
    fn inflection_warns_regardless_of_slope() {
        let config = TrendConfig::default();
        let series = points(&[
            (12.4, ValueStatus::Normal),
            (12.2, ValueStatus::Normal),
            (11.9, ValueStatus::Low),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Stable);
        assert!(verdict.warning, "normal-to-abnormal inflection must warn");
    }

    #[test]
    fn shallow_slope_is_stable() {
        let config = TrendConfig::default();
        let series = points(&[
            (13.5, ValueStatus::Normal),
            (13.6, ValueStatus::Normal),
            (13.8, ValueStatus::Normal),
        ]);
        let verdict = assess_trend("hemoglobin", &series, HGB_MIDPOINT, &config);
        assert_eq!(verdict.direction, TrendDirection::Stable);
        assert!(!verdict.warning);
    }
}
