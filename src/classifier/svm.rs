//! Linear support vector machine with Platt-calibrated probabilities.
//!
//! One binary machine per class (one-vs-rest), each trained with dual
//! coordinate descent on the L2-regularized hinge loss. The bias is learned
//! as the weight of a constant feature. After training, a sigmoid is fitted
//! to each machine's decision values (Platt scaling) and the calibrated
//! per-class scores are normalized into a distribution.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};
use crate::vectorizer::FeatureMatrix;

use super::algorithm::{ClassifierAlgorithm, check_training_input, dot};

/// SVM hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    /// Inverse regularization strength.
    pub c: f64,
    /// Maximum passes over the data per binary machine.
    pub max_iter: usize,
    /// Stop once the projected-gradient spread falls below this.
    pub tol: f64,
    /// Seed for the sample visiting order.
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-3,
            seed: 42,
        }
    }
}

/// One one-vs-rest machine plus its sigmoid calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryMachine {
    weights: Vec<f64>,
    bias: f64,
    /// P(positive | f) = 1 / (1 + exp(platt_a * f + platt_b))
    platt_a: f64,
    platt_b: f64,
}

impl BinaryMachine {
    fn decision(&self, features: &[f64]) -> f64 {
        dot(&self.weights, features) + self.bias
    }

    fn probability(&self, features: &[f64]) -> f64 {
        sigmoid_complement(self.platt_a * self.decision(features) + self.platt_b)
    }
}

/// Linear SVM classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    params: SvmParams,
    machines: Vec<BinaryMachine>,
}

impl LinearSvm {
    pub fn new(params: SvmParams) -> Self {
        Self {
            params,
            machines: Vec::new(),
        }
    }

    /// Raw decision values, one per class.
    pub fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.machines.iter().map(|m| m.decision(features)).collect()
    }
}

impl ClassifierAlgorithm for LinearSvm {
    fn fit(&mut self, features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(features, labels, n_classes)?;
        if n_classes < 2 {
            return Err(DeptClassError::model(
                "SVM needs samples of at least 2 classes",
            ));
        }

        let params = &self.params;
        let machines = (0..n_classes)
            .into_par_iter()
            .map(|class| {
                let targets: Vec<f64> = labels
                    .iter()
                    .map(|&label| if label == class { 1.0 } else { -1.0 })
                    .collect();
                let seed = params.seed.wrapping_add(class as u64);
                let (weights, bias) = train_binary(features, &targets, params, seed);

                let decisions: Vec<f64> = features
                    .rows()
                    .iter()
                    .map(|row| dot(&weights, row) + bias)
                    .collect();
                let (platt_a, platt_b) = fit_platt(&decisions, &targets);

                BinaryMachine {
                    weights,
                    bias,
                    platt_a,
                    platt_b,
                }
            })
            .collect();

        self.machines = machines;
        Ok(())
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        if self.machines.is_empty() {
            return Err(DeptClassError::not_trained("SVM has no fitted machines"));
        }
        let mut probabilities: Vec<f64> =
            self.machines.iter().map(|m| m.probability(features)).collect();
        let sum: f64 = probabilities.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            probabilities.iter_mut().for_each(|p| *p /= sum);
        } else {
            let uniform = 1.0 / probabilities.len() as f64;
            probabilities.iter_mut().for_each(|p| *p = uniform);
        }
        Ok(probabilities)
    }
}

/// Dual coordinate descent for one binary L1-loss SVM.
fn train_binary(
    features: &FeatureMatrix,
    targets: &[f64],
    params: &SvmParams,
    seed: u64,
) -> (Vec<f64>, f64) {
    let n_samples = features.n_samples();
    let c = params.c;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut weights = vec![0.0; features.n_features()];
    let mut bias = 0.0;
    let mut alpha = vec![0.0; n_samples];
    // Diagonal of the kernel matrix, including the constant bias feature.
    let q_diag: Vec<f64> = features
        .rows()
        .iter()
        .map(|row| dot(row, row) + 1.0)
        .collect();

    let mut order: Vec<usize> = (0..n_samples).collect();
    for _ in 0..params.max_iter {
        order.shuffle(&mut rng);
        let mut max_pg = f64::NEG_INFINITY;
        let mut min_pg = f64::INFINITY;

        for &i in &order {
            let row = features.row(i);
            let y = targets[i];
            let gradient = y * (dot(&weights, row) + bias) - 1.0;

            let projected = if alpha[i] <= 0.0 {
                gradient.min(0.0)
            } else if alpha[i] >= c {
                gradient.max(0.0)
            } else {
                gradient
            };
            max_pg = max_pg.max(projected);
            min_pg = min_pg.min(projected);

            if projected.abs() > 1e-12 {
                let old = alpha[i];
                alpha[i] = (old - gradient / q_diag[i]).clamp(0.0, c);
                let delta = (alpha[i] - old) * y;
                for (w, x) in weights.iter_mut().zip(row) {
                    *w += delta * x;
                }
                bias += delta;
            }
        }

        if max_pg - min_pg <= params.tol {
            break;
        }
    }

    (weights, bias)
}

/// 1 / (1 + exp(x)), computed without overflow.
fn sigmoid_complement(x: f64) -> f64 {
    if x >= 0.0 {
        let e = (-x).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + x.exp())
    }
}

/// Fit Platt's sigmoid `1 / (1 + exp(a * f + b))` to decision values.
///
/// Newton's method with backtracking line search on the regularized
/// targets proposed by Platt, following Lin, Lin and Weng (2007).
fn fit_platt(decisions: &[f64], targets: &[f64]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = targets.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = targets.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let t: Vec<f64> = targets
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&t)
            .map(|(&f, &ti)| {
                let fapb = f * a + b;
                if fapb >= 0.0 {
                    ti * fapb + (-fapb).exp().ln_1p()
                } else {
                    (ti - 1.0) * fapb + fapb.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &ti) in decisions.iter().zip(&t) {
            let fapb = f * a + b;
            let (p, q) = if fapb >= 0.0 {
                let e = (-fapb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = fapb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = ti - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * da;
            let new_b = b + step * db;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            break;
        }
    }

    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (FeatureMatrix, Vec<usize>) {
        let rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.2, 0.0],
            vec![0.8, 0.0, 0.1],
            vec![0.0, 1.0, 0.0],
            vec![0.1, 0.9, 0.0],
            vec![0.0, 0.8, 0.2],
            vec![0.0, 0.0, 1.0],
            vec![0.2, 0.0, 0.9],
            vec![0.0, 0.1, 0.8],
        ];
        (
            FeatureMatrix::new(rows, 3).unwrap(),
            vec![0, 0, 0, 1, 1, 1, 2, 2, 2],
        )
    }

    #[test]
    fn test_separable_classes() {
        let (features, labels) = separable();
        let mut svm = LinearSvm::new(SvmParams::default());
        svm.fit(&features, &labels, 3).unwrap();

        for (row, &label) in features.rows().iter().zip(&labels) {
            assert_eq!(svm.predict_label(row).unwrap(), label);
        }

        let probabilities = svm.predict_probabilities(&[0.0, 1.0, 0.0]).unwrap();
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probabilities.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(probabilities[1] > probabilities[0]);
        assert!(probabilities[1] > probabilities[2]);
    }

    #[test]
    fn test_single_class_rejected() {
        let features = FeatureMatrix::new(vec![vec![1.0], vec![0.5]], 1).unwrap();
        let mut svm = LinearSvm::new(SvmParams::default());
        assert!(matches!(
            svm.fit(&features, &[0, 0], 1),
            Err(DeptClassError::Model(_))
        ));
    }

    #[test]
    fn test_platt_orders_by_decision_value() {
        let decisions = [-2.0, -1.5, -1.0, 1.0, 1.5, 2.0];
        let targets = [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        let (a, b) = fit_platt(&decisions, &targets);
        let low = sigmoid_complement(a * -2.0 + b);
        let high = sigmoid_complement(a * 2.0 + b);
        assert!(high > 0.5);
        assert!(low < 0.5);
    }
}
