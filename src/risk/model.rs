//! Trained risk artifacts and the training loop behind them.
//!
//! Two kinds: standardized logistic regression fitted by full-batch gradient
//! descent, and a depth-1 decision stump for conditions whose signal is one
//! sharp threshold. Training is bounded by an iteration cap and a wall-clock
//! budget, and observes a cancel flag between iterations so a background
//! retrain can be abandoned without poisoning anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::engine::EngineError;
use crate::models::{LabeledExample, ModelKind, TrainingMetadata};

use super::metrics::{holdout_split, log_loss, roc_auc};

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Learned parameters, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelParams {
    Logistic {
        /// One weight per feature, in `feature_names` order, over
        /// standardized inputs.
        weights: Vec<f64>,
        intercept: f64,
    },
    Stump {
        /// Index into `feature_names`; thresholds are in raw units.
        feature: usize,
        threshold: f64,
        below_prob: f64,
        above_prob: f64,
        /// Positive rate in the training split, reported as the baseline.
        prior: f64,
    },
}

/// An immutable trained artifact. Versioning belongs to the registry; a
/// freshly trained model carries version 0 until it is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModel {
    pub condition: String,
    pub version: u32,
    pub feature_names: Vec<String>,
    pub params: ModelParams,
    /// Standardization constants captured at training time (identity for
    /// stumps, which split on raw units).
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub metadata: TrainingMetadata,
}

impl RiskModel {
    pub fn kind(&self) -> ModelKind {
        match self.params {
            ModelParams::Logistic { .. } => ModelKind::Logistic,
            ModelParams::Stump { .. } => ModelKind::Stump,
        }
    }

    pub fn predict_probability(&self, features: &[f64]) -> Result<f64, EngineError> {
        if features.len() != self.feature_names.len() {
            return Err(EngineError::FeatureMismatch {
                condition: self.condition.clone(),
                expected: self.feature_names.len(),
                got: features.len(),
            });
        }
        Ok(predict_raw(&self.params, &self.means, &self.stds, features))
    }

    /// Margin decomposition for attribution: (intercept, per-feature margin
    /// terms over standardized inputs). None for kinds without a margin.
    pub fn margin_terms(&self, features: &[f64]) -> Option<(f64, Vec<f64>)> {
        match &self.params {
            ModelParams::Logistic { weights, intercept } => {
                let terms = weights
                    .iter()
                    .zip(features.iter())
                    .zip(self.means.iter().zip(self.stds.iter()))
                    .map(|((w, x), (m, s))| w * ((x - m) / s.max(1e-9)))
                    .collect();
                Some((*intercept, terms))
            }
            ModelParams::Stump { .. } => None,
        }
    }
}

fn predict_raw(params: &ModelParams, means: &[f64], stds: &[f64], features: &[f64]) -> f64 {
    match params {
        ModelParams::Logistic { weights, intercept } => {
            let margin: f64 = weights
                .iter()
                .zip(features.iter())
                .zip(means.iter().zip(stds.iter()))
                .map(|((w, x), (m, s))| w * ((x - m) / s.max(1e-9)))
                .sum::<f64>()
                + intercept;
            sigmoid(margin)
        }
        ModelParams::Stump {
            feature,
            threshold,
            below_prob,
            above_prob,
            ..
        } => {
            if features[*feature] <= *threshold {
                *below_prob
            } else {
                *above_prob
            }
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Bounds and reproducibility knobs for one training run.
pub struct TrainOptions<'a> {
    pub min_examples: usize,
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub time_budget: Duration,
    pub holdout_fraction: f64,
    pub seed: u64,
    /// Checked between iterations; set by the owner of a background retrain.
    pub cancel: Option<&'a AtomicBool>,
}

impl TrainOptions<'_> {
    pub fn from_config(config: &RiskConfig) -> TrainOptions<'static> {
        TrainOptions {
            min_examples: config.min_training_examples,
            max_iterations: config.max_iterations,
            learning_rate: config.learning_rate,
            time_budget: Duration::from_millis(config.time_budget_ms),
            holdout_fraction: config.holdout_fraction,
            seed: config.seed,
            cancel: None,
        }
    }
}

/// Train one condition model.
///
/// Refuses datasets below the minimum or with a single label class — there
/// is deliberately no fallback majority-class model; an untrainable
/// condition stays unregistered and predictions for it keep failing loudly.
pub fn train(
    condition: &str,
    kind: ModelKind,
    feature_names: Vec<String>,
    examples: &[LabeledExample],
    opts: &TrainOptions,
) -> Result<RiskModel, EngineError> {
    let n = examples.len();
    if n < opts.min_examples {
        return Err(EngineError::InsufficientData {
            condition: condition.to_string(),
            needed: opts.min_examples,
            got: n,
        });
    }
    let width = feature_names.len();
    for example in examples {
        if example.features.len() != width {
            return Err(EngineError::FeatureMismatch {
                condition: condition.to_string(),
                expected: width,
                got: example.features.len(),
            });
        }
    }
    let positives = examples.iter().filter(|e| e.label).count();
    if positives == 0 || positives == n {
        // Single-class sets report the minority-class count.
        return Err(EngineError::InsufficientData {
            condition: condition.to_string(),
            needed: 1,
            got: 0,
        });
    }

    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let (train_idx, holdout_idx) = holdout_split(n, opts.holdout_fraction, &mut rng);

    let x_train = matrix_of(examples, &train_idx, width);
    let y_train =
        Array1::from_iter(train_idx.iter().map(|&i| if examples[i].label { 1.0 } else { 0.0 }));

    let (params, means, stds, iterations, final_loss) = match kind {
        ModelKind::Logistic => {
            let (means, stds) = column_stats(&x_train);
            let z_train = standardize_matrix(&x_train, &means, &stds);
            let (params, iterations, final_loss) =
                fit_logistic(condition, &z_train, &y_train, opts, &mut rng, started)?;
            (params, means, stds, iterations, final_loss)
        }
        ModelKind::Stump => {
            let (params, iterations, final_loss) =
                fit_stump(condition, &x_train, &y_train, opts, started)?;
            (params, vec![0.0; width], vec![1.0; width], iterations, final_loss)
        }
    };

    let holdout_scores: Vec<f64> = holdout_idx
        .iter()
        .map(|&i| predict_raw(&params, &means, &stds, &examples[i].features))
        .collect();
    let holdout_labels: Vec<bool> = holdout_idx.iter().map(|&i| examples[i].label).collect();
    let holdout_auc = roc_auc(&holdout_scores, &holdout_labels);

    Ok(RiskModel {
        condition: condition.to_string(),
        version: 0,
        feature_names,
        params,
        means,
        stds,
        metadata: TrainingMetadata {
            trained_at: Utc::now(),
            examples: n,
            iterations,
            final_loss,
            holdout_auc,
        },
    })
}

/// Cancel beats timeout when both apply; either aborts between iterations.
fn check_interrupt(
    condition: &str,
    opts: &TrainOptions,
    started: Instant,
) -> Result<(), EngineError> {
    if opts.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
        return Err(EngineError::TrainingCancelled {
            condition: condition.to_string(),
        });
    }
    if started.elapsed() >= opts.time_budget {
        return Err(EngineError::TrainingTimeout {
            condition: condition.to_string(),
            budget_ms: opts.time_budget.as_millis() as u64,
        });
    }
    Ok(())
}

fn fit_logistic(
    condition: &str,
    z: &Array2<f64>,
    y: &Array1<f64>,
    opts: &TrainOptions,
    rng: &mut StdRng,
    started: Instant,
) -> Result<(ModelParams, usize, f64), EngineError> {
    let n = z.nrows().max(1) as f64;
    let d = z.ncols();

    let mut weights: Array1<f64> = Array1::from_shape_fn(d, |_| rng.gen_range(-0.01..0.01));
    let mut intercept = 0.0;
    let mut prev_loss = f64::INFINITY;
    let mut final_loss = f64::INFINITY;
    let mut iterations = 0;

    for iteration in 0..opts.max_iterations {
        check_interrupt(condition, opts, started)?;

        let margins = z.dot(&weights) + intercept;
        let probs = margins.mapv(sigmoid);
        let residual = &probs - y;

        let grad_w = z.t().dot(&residual) / n;
        let grad_b = residual.sum() / n;
        weights = &weights - &(&grad_w * opts.learning_rate);
        intercept -= opts.learning_rate * grad_b;

        final_loss = log_loss(&probs, y);
        iterations = iteration + 1;
        if (prev_loss - final_loss).abs() < 1e-9 {
            break;
        }
        prev_loss = final_loss;
    }

    Ok((
        ModelParams::Logistic {
            weights: weights.to_vec(),
            intercept,
        },
        iterations,
        final_loss,
    ))
}

fn fit_stump(
    condition: &str,
    x: &Array2<f64>,
    y: &Array1<f64>,
    opts: &TrainOptions,
    started: Instant,
) -> Result<(ModelParams, usize, f64), EngineError> {
    let n = x.nrows();
    let d = x.ncols();
    let prior = y.sum() / n.max(1) as f64;

    let mut best: Option<(usize, f64, f64)> = None;
    for j in 0..d {
        check_interrupt(condition, opts, started)?;

        let mut levels: Vec<f64> = x.column(j).iter().copied().collect();
        levels.sort_by(f64::total_cmp);
        levels.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        for pair in levels.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let gini = split_gini(x, y, j, threshold);
            if best.map_or(true, |(_, _, g)| gini < g) {
                best = Some((j, threshold, gini));
            }
        }
    }

    // Every column constant: no split exists. Degrade to the prior on both
    // sides rather than failing — the artifact stays honest about its AUC.
    let (feature, threshold, gini) = best.unwrap_or((0, x.column(0).mean().unwrap_or(0.0), 0.5));

    let mut below = (0usize, 0.0f64);
    let mut above = (0usize, 0.0f64);
    for (row, label) in x.outer_iter().zip(y.iter()) {
        if row[feature] <= threshold {
            below = (below.0 + 1, below.1 + label);
        } else {
            above = (above.0 + 1, above.1 + label);
        }
    }
    // Laplace smoothing keeps leaves off the 0/1 rails.
    let below_prob = (below.1 + 1.0) / (below.0 as f64 + 2.0);
    let above_prob = (above.1 + 1.0) / (above.0 as f64 + 2.0);

    Ok((
        ModelParams::Stump {
            feature,
            threshold,
            below_prob,
            above_prob,
            prior,
        },
        d,
        gini,
    ))
}

/// Weighted Gini impurity for a candidate split.
fn split_gini(x: &Array2<f64>, y: &Array1<f64>, feature: usize, threshold: f64) -> f64 {
    let mut below = (0usize, 0.0f64);
    let mut above = (0usize, 0.0f64);
    for (row, label) in x.outer_iter().zip(y.iter()) {
        if row[feature] <= threshold {
            below = (below.0 + 1, below.1 + label);
        } else {
            above = (above.0 + 1, above.1 + label);
        }
    }
    let n = (below.0 + above.0) as f64;
    let side = |count: usize, pos: f64| -> f64 {
        if count == 0 {
            return 0.0;
        }
        let p = pos / count as f64;
        (count as f64 / n) * 2.0 * p * (1.0 - p)
    };
    side(below.0, below.1) + side(above.0, above.1)
}

fn matrix_of(examples: &[LabeledExample], indices: &[usize], width: usize) -> Array2<f64> {
    let mut matrix = Array2::zeros((indices.len(), width));
    for (row, &i) in indices.iter().enumerate() {
        for (col, value) in examples[i].features.iter().enumerate() {
            matrix[[row, col]] = *value;
        }
    }
    matrix
}

fn column_stats(x: &Array2<f64>) -> (Vec<f64>, Vec<f64>) {
    let n = x.nrows().max(1) as f64;
    let mut means = Vec::with_capacity(x.ncols());
    let mut stds = Vec::with_capacity(x.ncols());
    for col in x.columns() {
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        means.push(mean);
        stds.push(var.sqrt().max(1e-9));
    }
    (means, stds)
}

fn standardize_matrix(x: &Array2<f64>, means: &[f64], stds: &[f64]) -> Array2<f64> {
    let mut z = x.clone();
    for (mut col, (mean, std)) in z.columns_mut().into_iter().zip(means.iter().zip(stds.iter())) {
        col.mapv_inplace(|v| (v - mean) / std);
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn options() -> TrainOptions<'static> {
        TrainOptions::from_config(&RiskConfig::default())
    }

    /// Linearly separable two-feature toy set: positives sit high on both.
    fn separable(n_per_class: usize) -> Vec<LabeledExample> {
        let mut examples = Vec::new();
        for i in 0..n_per_class {
            let jitter = i as f64 * 0.01;
            examples.push(LabeledExample::new(vec![1.0 + jitter, 2.0 + jitter], false));
            examples.push(LabeledExample::new(vec![5.0 + jitter, 8.0 + jitter], true));
        }
        examples
    }

    #[test]
    fn too_few_examples_is_insufficient_data() {
        let examples = separable(5); // 10 total, below the default 30
        let err = train("anemia", ModelKind::Logistic, names(), &examples, &options()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientData { needed: 30, got: 10, .. }
        ));
    }

    #[test]
    fn single_class_is_insufficient_data() {
        let examples: Vec<LabeledExample> = (0..40)
            .map(|i| LabeledExample::new(vec![i as f64, 1.0], true))
            .collect();
        let err = train("anemia", ModelKind::Logistic, names(), &examples, &options()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn preset_cancel_flag_aborts_before_work() {
        let cancel = AtomicBool::new(true);
        let mut opts = options();
        opts.cancel = Some(&cancel);
        let err = train("anemia", ModelKind::Logistic, names(), &separable(20), &opts).unwrap_err();
        assert!(matches!(err, EngineError::TrainingCancelled { .. }));
    }

    #[test]
    fn zero_budget_times_out() {
        let mut opts = options();
        opts.time_budget = Duration::ZERO;
        let err = train("anemia", ModelKind::Logistic, names(), &separable(20), &opts).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TrainingTimeout { budget_ms: 0, .. }
        ));
    }

    #[test]
    fn logistic_separates_a_separable_set() {
        let examples = separable(20);
        let model = train("anemia", ModelKind::Logistic, names(), &examples, &options()).unwrap();

        let low = model.predict_probability(&[1.0, 2.0]).unwrap();
        let high = model.predict_probability(&[5.0, 8.0]).unwrap();
        assert!(low < 0.5, "negative-side probability {low}");
        assert!(high > 0.5, "positive-side probability {high}");
        assert!(model.metadata.holdout_auc > 0.9, "auc {}", model.metadata.holdout_auc);
        assert!(model.metadata.iterations > 0);
        assert_eq!(model.metadata.examples, 40);
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let examples = separable(20);
        let a = train("anemia", ModelKind::Logistic, names(), &examples, &options()).unwrap();
        let b = train("anemia", ModelKind::Logistic, names(), &examples, &options()).unwrap();
        match (&a.params, &b.params) {
            (
                ModelParams::Logistic { weights: wa, intercept: ia },
                ModelParams::Logistic { weights: wb, intercept: ib },
            ) => {
                assert_eq!(wa, wb);
                assert_eq!(ia, ib);
            }
            _ => panic!("expected logistic params"),
        }
        assert_eq!(a.metadata.holdout_auc, b.metadata.holdout_auc);
    }

    #[test]
    fn stump_finds_the_separating_threshold() {
        let examples = separable(20);
        let model = train("infection", ModelKind::Stump, names(), &examples, &options()).unwrap();

        match model.params {
            ModelParams::Stump { threshold, feature, below_prob, above_prob, .. } => {
                // Either feature separates; the threshold must sit between
                // the class clusters of whichever was chosen.
                let (lo_max, hi_min) = if feature == 0 { (1.2, 5.0) } else { (2.2, 8.0) };
                assert!(
                    threshold > lo_max && threshold < hi_min,
                    "threshold {threshold} outside the gap for feature {feature}"
                );
                assert!(below_prob < 0.5 && above_prob > 0.5);
            }
            _ => panic!("expected stump params"),
        }
        let low = model.predict_probability(&[1.0, 2.0]).unwrap();
        let high = model.predict_probability(&[5.0, 8.0]).unwrap();
        assert!(low < 0.5 && high > 0.5);
    }

    #[test]
    fn wrong_feature_width_is_a_mismatch() {
        let model = train(
            "anemia",
            ModelKind::Logistic,
            names(),
            &separable(20),
            &options(),
        )
        .unwrap();
        let err = model.predict_probability(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::FeatureMismatch { expected: 2, got: 1, .. }
        ));
    }

    fn names() -> Vec<String> {
        vec!["wbc".into(), "platelets".into()]
    }
}
