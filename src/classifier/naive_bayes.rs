//! Multinomial naive Bayes.

use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};
use crate::vectorizer::FeatureMatrix;

use super::algorithm::{ClassifierAlgorithm, check_training_input, dot, softmax_in_place};

/// Smallest smoothing value used, so `alpha = 0` cannot produce `ln(0)`.
const MIN_ALPHA: f64 = 1e-10;

/// Naive Bayes hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesParams {
    /// Additive (Laplace/Lidstone) smoothing.
    pub alpha: f64,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// Multinomial naive Bayes over non-negative feature weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNaiveBayes {
    params: NaiveBayesParams,
    /// ln P(class)
    class_log_prior: Vec<f64>,
    /// ln P(feature | class), one row per class.
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNaiveBayes {
    pub fn new(params: NaiveBayesParams) -> Self {
        Self {
            params,
            class_log_prior: Vec::new(),
            feature_log_prob: Vec::new(),
        }
    }

    /// Joint log-likelihood of each class for one row.
    fn joint_log_likelihood(&self, features: &[f64]) -> Vec<f64> {
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_prob)| prior + dot(features, log_prob))
            .collect()
    }
}

impl ClassifierAlgorithm for MultinomialNaiveBayes {
    fn fit(&mut self, features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(features, labels, n_classes)?;
        let n_features = features.n_features();

        let mut class_count = vec![0usize; n_classes];
        let mut feature_count = vec![vec![0.0; n_features]; n_classes];
        for (row, &label) in features.rows().iter().zip(labels) {
            if row.iter().any(|&v| v < 0.0) {
                return Err(DeptClassError::model(
                    "negative values in input to multinomial naive Bayes",
                ));
            }
            class_count[label] += 1;
            for (total, value) in feature_count[label].iter_mut().zip(row) {
                *total += value;
            }
        }

        if let Some(empty) = class_count.iter().position(|&count| count == 0) {
            return Err(DeptClassError::model(format!(
                "class {empty} has no training samples"
            )));
        }

        let alpha = self.params.alpha.max(MIN_ALPHA);
        let n_samples = labels.len() as f64;

        self.class_log_prior = class_count
            .iter()
            .map(|&count| (count as f64 / n_samples).ln())
            .collect();

        self.feature_log_prob = feature_count
            .into_iter()
            .map(|counts| {
                let denominator = (counts.iter().sum::<f64>() + alpha * n_features as f64).ln();
                counts
                    .into_iter()
                    .map(|count| (count + alpha).ln() - denominator)
                    .collect()
            })
            .collect();

        Ok(())
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        if self.class_log_prior.is_empty() {
            return Err(DeptClassError::not_trained("naive Bayes has no fitted classes"));
        }
        let mut scores = self.joint_log_likelihood(features);
        softmax_in_place(&mut scores);
        Ok(scores)
    }
}
