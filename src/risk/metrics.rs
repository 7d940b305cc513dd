use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Seeded shuffle split: returns (train indices, holdout indices). The
/// holdout always keeps at least one example and never swallows the whole
/// set.
pub fn holdout_split(n: usize, fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let holdout_len = ((n as f64 * fraction).round() as usize).clamp(1, n.saturating_sub(1).max(1));
    let holdout = indices.split_off(n - holdout_len);
    (indices, holdout)
}

/// Mean binary cross-entropy. Probabilities are clamped away from 0 and 1 so
/// a saturated model never produces an infinite loss.
pub fn log_loss(probs: &Array1<f64>, labels: &Array1<f64>) -> f64 {
    let n = probs.len().max(1) as f64;
    probs
        .iter()
        .zip(labels.iter())
        .map(|(p, y)| {
            let p = p.clamp(1e-12, 1.0 - 1e-12);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n
}

/// ROC AUC via the rank statistic (Mann-Whitney), with tied scores given
/// their average rank. A single-class label set scores the uninformative 0.5.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    let pos = labels.iter().filter(|&&l| l).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks across ties, 1-based.
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|(l, _)| **l)
        .map(|(_, r)| r)
        .sum();
    let u = pos_rank_sum - (pos as f64 * (pos as f64 + 1.0)) / 2.0;
    u / (pos as f64 * neg as f64)
}
