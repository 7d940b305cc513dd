//! Seeded synthetic cohorts for bootstrapping condition models.
//!
//! A lab archive big enough to train on rarely exists at install time, so
//! each built-in condition ships a generator that draws plausible healthy
//! and affected profiles from fixed ranges. Same seed, same cohort, same
//! trained model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::models::LabeledExample;

/// Size and reproducibility of a generated cohort.
#[derive(Debug, Clone)]
pub struct CohortConfig {
    /// Examples drawn per class; cohorts are balanced.
    pub per_class: usize,
    pub seed: u64,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            per_class: 40,
            seed: 42,
        }
    }
}

fn draw(rng: &mut StdRng, ranges: &[(f64, f64)]) -> Vec<f64> {
    ranges.iter().map(|&(lo, hi)| rng.gen_range(lo..hi)).collect()
}

fn cohort(
    config: &CohortConfig,
    healthy: &[(f64, f64)],
    affected: &[(f64, f64)],
) -> Vec<LabeledExample> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut examples = Vec::with_capacity(config.per_class * 2);
    for _ in 0..config.per_class {
        examples.push(LabeledExample::new(draw(&mut rng, healthy), false));
        examples.push(LabeledExample::new(draw(&mut rng, affected), true));
    }
    examples
}

/// Feature order: hemoglobin, rbc, platelets, hemoglobin slope, age.
pub fn anemia_cohort(config: &CohortConfig) -> Vec<LabeledExample> {
    cohort(
        config,
        &[
            (12.5, 15.0),
            (4.3, 5.3),
            (180.0, 400.0),
            (-0.2, 0.2),
            (25.0, 70.0),
        ],
        &[
            (8.0, 11.5),
            (3.2, 4.2),
            (150.0, 350.0),
            (-1.5, -0.3),
            (30.0, 80.0),
        ],
    )
}

/// Feature order: cholesterol, hdl, ldl, triglycerides, ldl slope, age.
pub fn cardiovascular_cohort(config: &CohortConfig) -> Vec<LabeledExample> {
    cohort(
        config,
        &[
            (140.0, 195.0),
            (45.0, 60.0),
            (70.0, 125.0),
            (60.0, 140.0),
            (-5.0, 5.0),
            (25.0, 65.0),
        ],
        &[
            (200.0, 280.0),
            (28.0, 42.0),
            (135.0, 190.0),
            (160.0, 320.0),
            (0.0, 15.0),
            (40.0, 85.0),
        ],
    )
}

/// Feature order: wbc, platelets, wbc slope.
pub fn infection_cohort(config: &CohortConfig) -> Vec<LabeledExample> {
    cohort(
        config,
        &[(4.5, 10.5), (160.0, 400.0), (-0.5, 0.5)],
        &[(11.5, 22.0), (120.0, 450.0), (0.5, 4.0)],
    )
}

/// The generator for a built-in condition, by name.
pub fn for_condition(
    condition: &str,
    config: &CohortConfig,
) -> Result<Vec<LabeledExample>, EngineError> {
    match condition {
        "anemia" => Ok(anemia_cohort(config)),
        "cardiovascular" => Ok(cardiovascular_cohort(config)),
        "infection" => Ok(infection_cohort(config)),
        other => Err(EngineError::Config(ConfigError::Invalid {
            reason: format!("no cohort generator for condition '{other}'"),
        })),
    }
}
