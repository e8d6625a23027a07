//! Random forest of Gini decision trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};
use crate::vectorizer::FeatureMatrix;

use super::algorithm::{ClassifierAlgorithm, check_training_input};

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Depth limit; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    /// Base seed; tree `t` uses `seed + t`.
    pub seed: u64,
    /// Draw a bootstrap sample per tree.
    pub bootstrap: bool,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
            bootstrap: true,
        }
    }
}

/// Random forest classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ClassifierAlgorithm for RandomForest {
    fn fit(&mut self, features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(features, labels, n_classes)?;
        if self.params.n_estimators == 0 {
            return Err(DeptClassError::model("random forest needs at least one tree"));
        }

        let params = &self.params;
        let n_samples = features.n_samples();
        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n_samples)
                        .map(|_| rng.random_range(0..n_samples))
                        .collect()
                } else {
                    (0..n_samples).collect()
                };
                DecisionTree::fit(features, labels, n_classes, &indices, params, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(DeptClassError::not_trained("random forest has no trees"));
        }
        let mut probabilities = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in probabilities.iter_mut().zip(tree.predict(features)) {
                *total += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= n_trees);
        Ok(probabilities)
    }
}

/// Classification tree grown on Gini impurity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeNode {
    /// Feature index for split (-1 for leaf).
    feature_idx: i32,
    /// Samples with `x[feature_idx] <= threshold` go left.
    threshold: f64,
    /// Class distribution of the training samples that reached this node.
    distribution: Vec<f64>,
    left: Option<Box<TreeNode>>,
    right: Option<Box<TreeNode>>,
}

impl TreeNode {
    fn leaf(distribution: Vec<f64>) -> Self {
        Self {
            feature_idx: -1,
            threshold: 0.0,
            distribution,
            left: None,
            right: None,
        }
    }
}

/// Best split found for one node.
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Shared inputs of one tree's recursive build.
struct TreeBuilder<'a> {
    features: &'a FeatureMatrix,
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl DecisionTree {
    fn fit(
        features: &FeatureMatrix,
        labels: &[usize],
        n_classes: usize,
        indices: &[usize],
        params: &RandomForestParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = features.n_features();
        let builder = TreeBuilder {
            features,
            labels,
            n_classes,
            max_features: ((n_features as f64).sqrt().floor() as usize).max(1),
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
        };
        let root = builder.build(indices.to_vec(), 0, rng);
        Self { root }
    }

    /// Class distribution of the leaf `features` falls into.
    pub fn predict(&self, features: &[f64]) -> &[f64] {
        let mut node = &self.root;
        loop {
            if node.feature_idx < 0 {
                return &node.distribution;
            }
            let value = features
                .get(node.feature_idx as usize)
                .copied()
                .unwrap_or(0.0);
            let next = if value <= node.threshold {
                node.left.as_deref()
            } else {
                node.right.as_deref()
            };
            match next {
                Some(child) => node = child,
                None => return &node.distribution,
            }
        }
    }
}

impl TreeBuilder<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Recursively grow a node.
    ///
    /// Stops when the node is pure, too small to split, at the depth limit,
    /// or when every feature is constant over its samples.
    fn build(&self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> TreeNode {
        let counts = self.class_counts(&indices);
        let total = indices.len() as f64;
        let distribution: Vec<f64> = counts.iter().map(|&c| c as f64 / total).collect();

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || indices.len() < self.min_samples_split {
            return TreeNode::leaf(distribution);
        }

        let Some(split) = self.find_best_split(&indices, rng) else {
            return TreeNode::leaf(distribution);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features.row(i)[split.feature] <= split.threshold);

        TreeNode {
            feature_idx: split.feature as i32,
            threshold: split.threshold,
            distribution,
            left: Some(Box::new(self.build(left, depth + 1, rng))),
            right: Some(Box::new(self.build(right, depth + 1, rng))),
        }
    }

    /// Search random features for the split with the lowest weighted Gini
    /// impurity.
    ///
    /// Features are drawn without replacement. Features that are constant
    /// over the node do not count toward `max_features`, and the search
    /// keeps drawing past the budget until at least one valid split exists.
    fn find_best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<Split> {
        let n_features = self.features.n_features();
        let mut candidates: Vec<usize> = (0..n_features).collect();
        let mut best: Option<Split> = None;
        let mut visited = 0;

        for drawn in 0..n_features {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let pick = rng.random_range(drawn..n_features);
            candidates.swap(drawn, pick);
            let feature = candidates[drawn];

            let Some(split) = self.best_split_for(feature, indices) else {
                continue;
            };
            visited += 1;
            if best.as_ref().is_none_or(|b| split.impurity < b.impurity) {
                best = Some(split);
            }
        }

        best
    }

    /// Best threshold on one feature; `None` when the feature is constant.
    fn best_split_for(&self, feature: usize, indices: &[usize]) -> Option<Split> {
        let mut values: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.features.row(i)[feature], self.labels[i]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let first = values.first()?.0;
        let last = values.last()?.0;
        if first == last {
            return None;
        }

        let n = values.len();
        let mut right_counts = vec![0usize; self.n_classes];
        for &(_, label) in &values {
            right_counts[label] += 1;
        }
        let mut left_counts = vec![0usize; self.n_classes];
        let mut best: Option<Split> = None;

        for i in 1..n {
            let label = values[i - 1].1;
            left_counts[label] += 1;
            right_counts[label] -= 1;

            if values[i - 1].0 == values[i].0 {
                continue;
            }

            let impurity = (i as f64 * gini(&left_counts, i)
                + (n - i) as f64 * gini(&right_counts, n - i))
                / n as f64;
            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                best = Some(Split {
                    feature,
                    threshold: (values[i - 1].0 + values[i].0) / 2.0,
                    impurity,
                });
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (FeatureMatrix, Vec<usize>) {
        let rows = vec![
            vec![0.9, 0.0, 0.1, 0.0],
            vec![0.8, 0.1, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.9, 0.0, 0.1],
            vec![0.1, 0.8, 0.0, 0.0],
            vec![0.0, 1.0, 0.1, 0.0],
        ];
        (FeatureMatrix::new(rows, 4).unwrap(), vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_forest_learns_blobs() {
        let (features, labels) = blobs();
        let mut forest = RandomForest::new(RandomForestParams {
            n_estimators: 25,
            ..Default::default()
        });
        forest.fit(&features, &labels, 2).unwrap();
        assert_eq!(forest.n_trees(), 25);

        assert_eq!(forest.predict_label(&[1.0, 0.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(forest.predict_label(&[0.0, 1.0, 0.0, 0.0]).unwrap(), 1);

        let probabilities = forest.predict_probabilities(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, labels) = blobs();
        let params = RandomForestParams {
            n_estimators: 10,
            ..Default::default()
        };
        let mut a = RandomForest::new(params.clone());
        let mut b = RandomForest::new(params);
        a.fit(&features, &labels, 2).unwrap();
        b.fit(&features, &labels, 2).unwrap();

        let point = [0.5, 0.4, 0.05, 0.05];
        assert_eq!(
            a.predict_probabilities(&point).unwrap(),
            b.predict_probabilities(&point).unwrap()
        );
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let features = FeatureMatrix::new(vec![vec![1.0, 1.0]; 4], 2).unwrap();
        let mut forest = RandomForest::new(RandomForestParams {
            n_estimators: 1,
            bootstrap: false,
            ..Default::default()
        });
        forest.fit(&features, &[0, 1, 0, 1], 2).unwrap();
        assert_eq!(
            forest.predict_probabilities(&[1.0, 1.0]).unwrap(),
            vec![0.5, 0.5]
        );
    }

    #[test]
    fn test_depth_limit() {
        let (features, labels) = blobs();
        let mut forest = RandomForest::new(RandomForestParams {
            n_estimators: 1,
            max_depth: Some(0),
            bootstrap: false,
            ..Default::default()
        });
        forest.fit(&features, &labels, 2).unwrap();
        assert_eq!(
            forest.predict_probabilities(&[1.0, 0.0, 0.0, 0.0]).unwrap(),
            vec![0.5, 0.5]
        );
    }
}
