//! Algorithm strategy trait and shared numeric helpers.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DeptClassError, Result};
use crate::vectorizer::FeatureMatrix;

/// The capability set one classification algorithm provides.
///
/// Labels are class indices in `0..n_classes`; the wrapping variant maps
/// them to departments. Implementations are plain data so the variant can
/// clone them for transactional training and serialize them for storage.
pub trait ClassifierAlgorithm:
    Clone + Send + Sync + std::fmt::Debug + Serialize + DeserializeOwned
{
    /// Fit on every row of `features`. Replaces any previous fit.
    fn fit(&mut self, features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()>;

    /// Class probabilities for one row, `n_classes` long.
    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Most likely class for one row.
    fn predict_label(&self, features: &[f64]) -> Result<usize> {
        let probabilities = self.predict_probabilities(features)?;
        argmax(&probabilities)
            .ok_or_else(|| DeptClassError::model("model produced no class scores"))
    }

    /// Whether `predict_probabilities` is meaningful for this algorithm.
    fn supports_probabilities(&self) -> bool {
        true
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Turn scores into probabilities in place (numerically stable softmax).
pub fn softmax_in_place(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let uniform = 1.0 / scores.len() as f64;
        scores.iter_mut().for_each(|s| *s = uniform);
        return;
    }
    let mut sum = 0.0;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        sum += *score;
    }
    for score in scores.iter_mut() {
        *score /= sum;
    }
}

/// Check the common preconditions of `fit`.
pub(crate) fn check_training_input(
    features: &FeatureMatrix,
    labels: &[usize],
    n_classes: usize,
) -> Result<()> {
    if features.is_empty() {
        return Err(DeptClassError::model("cannot fit on an empty training set"));
    }
    if features.n_samples() != labels.len() {
        return Err(DeptClassError::model(format!(
            "{} feature rows but {} labels",
            features.n_samples(),
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&label| label >= n_classes) {
        return Err(DeptClassError::model(format!(
            "label {bad} out of range for {n_classes} classes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut scores = vec![1000.0, 1001.0, 999.0];
        softmax_in_place(&mut scores);
        let sum: f64 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&scores), Some(1));
    }
}
