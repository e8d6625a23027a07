//! Multinomial logistic regression.

use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};
use crate::vectorizer::FeatureMatrix;

use super::algorithm::{ClassifierAlgorithm, check_training_input, dot, softmax_in_place};

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticRegressionParams {
    /// Inverse L2 regularization strength.
    pub c: f64,
    /// Maximum gradient descent steps.
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop once the largest gradient component falls below this.
    pub tol: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 1.0,
            tol: 1e-6,
        }
    }
}

/// Softmax regression trained with full-batch gradient descent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticRegressionParams,
    /// One weight row per class.
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    /// Steps taken by the last fit.
    n_iter: usize,
}

impl LogisticRegression {
    pub fn new(params: LogisticRegressionParams) -> Self {
        Self {
            params,
            weights: Vec::new(),
            intercepts: Vec::new(),
            n_iter: 0,
        }
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn scores(weights: &[Vec<f64>], intercepts: &[f64], features: &[f64]) -> Vec<f64> {
        weights
            .iter()
            .zip(intercepts)
            .map(|(w, b)| dot(w, features) + b)
            .collect()
    }
}

impl ClassifierAlgorithm for LogisticRegression {
    fn fit(&mut self, features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(features, labels, n_classes)?;
        if n_classes < 2 {
            return Err(DeptClassError::model(
                "logistic regression needs samples of at least 2 classes",
            ));
        }

        let n_samples = features.n_samples() as f64;
        let n_features = features.n_features();
        let penalty = 1.0 / (self.params.c * n_samples);
        let rate = self.params.learning_rate;

        let mut weights = vec![vec![0.0; n_features]; n_classes];
        let mut intercepts = vec![0.0; n_classes];
        let mut n_iter = 0;

        for _ in 0..self.params.max_iter {
            n_iter += 1;
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (row, &label) in features.rows().iter().zip(labels) {
                let mut p = Self::scores(&weights, &intercepts, row);
                softmax_in_place(&mut p);
                for (class, p_class) in p.into_iter().enumerate() {
                    let error = p_class - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += error;
                    for (g, x) in grad_w[class].iter_mut().zip(row) {
                        *g += error * x;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for class in 0..n_classes {
                grad_b[class] /= n_samples;
                max_grad = max_grad.max(grad_b[class].abs());
                for (g, w) in grad_w[class].iter_mut().zip(&weights[class]) {
                    *g = *g / n_samples + penalty * w;
                    max_grad = max_grad.max(g.abs());
                }
            }

            if max_grad < self.params.tol {
                break;
            }

            for class in 0..n_classes {
                intercepts[class] -= rate * grad_b[class];
                for (w, g) in weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= rate * g;
                }
            }
        }

        if weights.iter().flatten().chain(&intercepts).any(|w| !w.is_finite()) {
            return Err(DeptClassError::model(
                "logistic regression diverged; lower the learning rate",
            ));
        }

        self.weights = weights;
        self.intercepts = intercepts;
        self.n_iter = n_iter;
        Ok(())
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        if self.weights.is_empty() {
            return Err(DeptClassError::not_trained(
                "logistic regression has no fitted weights",
            ));
        }
        let mut p = Self::scores(&self.weights, &self.intercepts, features);
        softmax_in_place(&mut p);
        Ok(p)
    }
}
