//! Department classifiers.
//!
//! Four algorithms share one contract. Each algorithm is a small strategy
//! implementing [`ClassifierAlgorithm`]; [`ClassifierVariant`] wraps any of
//! them and adds everything the engine relies on: label bookkeeping,
//! probability alignment to [`Department::ALL`], training reports and
//! persistence. The engine only ever sees `Box<dyn DepartmentClassifier>`
//! handles built by the [`ModelRegistry`].
//!
//! # Architecture
//!
//! - `DepartmentClassifier` trait: object-safe contract used by the engine
//! - `ClassifierAlgorithm` trait: fit / predict capability set of one algorithm
//! - `ClassifierVariant<A>`: the generic variant
//! - `MultinomialNaiveBayes`, `LinearSvm`, `RandomForest`, `LogisticRegression`
//! - `ModelRegistry` / `ModelKind`: identifiers and construction

pub mod algorithm;
pub mod logistic;
pub mod naive_bayes;
pub mod random_forest;
pub mod registry;
pub mod svm;
pub mod variant;

pub use algorithm::ClassifierAlgorithm;
pub use logistic::{LogisticRegression, LogisticRegressionParams};
pub use naive_bayes::{MultinomialNaiveBayes, NaiveBayesParams};
pub use random_forest::{RandomForest, RandomForestParams};
pub use registry::{ModelInfo, ModelKind, ModelRegistry};
pub use svm::{LinearSvm, SvmParams};
pub use variant::ClassifierVariant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::department::Department;
use crate::error::Result;
use crate::persistence::ModelStore;
use crate::vectorizer::FeatureMatrix;

/// Status string of a successful training run.
pub const STATUS_TRAINED: &str = "trained";

/// Round to 3 decimal places, the precision of every reported score.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Outcome of training one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Model identifier.
    pub model_type: String,
    /// Accuracy on the training set, rounded to 3 decimals. 0.0 on failure.
    pub accuracy: f64,
    /// `"trained"`, or `"error: <message>"`.
    pub status: String,
    /// Number of samples the model was fitted on.
    pub training_samples: usize,
    /// Wall-clock training time.
    pub training_time_ms: u64,
}

impl TrainingReport {
    /// Whether training succeeded.
    pub fn is_trained(&self) -> bool {
        self.status == STATUS_TRAINED
    }
}

/// Metadata recorded for a trained classifier and persisted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model identifier.
    pub model_type: String,
    /// Training timestamp.
    pub trained_at: DateTime<Utc>,
    /// Number of training samples.
    pub training_samples: usize,
    /// Width of the feature space the model was trained on.
    pub n_features: usize,
    /// Fingerprint of the vocabulary the training features came from.
    pub vocabulary_fingerprint: u32,
    /// Training-set accuracy.
    pub accuracy: f64,
}

/// Contract shared by every classifier variant.
pub trait DepartmentClassifier: Send + Sync + std::fmt::Debug {
    /// Which registered model this is.
    fn kind(&self) -> ModelKind;

    /// Whether the classifier holds a trained model.
    fn is_trained(&self) -> bool;

    /// Departments seen at training time, in [`Department::ALL`] order.
    fn classes(&self) -> &[Department];

    /// Metadata of the current trained model, if any.
    fn metadata(&self) -> Option<&ModelMetadata>;

    /// Fit on the full feature/label set.
    ///
    /// Never fails: problems are reported with `accuracy = 0.0` and an
    /// `"error: ..."` status, and the classifier keeps its previous state.
    fn train(&mut self, features: &FeatureMatrix, labels: &[Department]) -> TrainingReport;

    /// Most likely department for one feature row.
    fn predict(&self, features: &[f64]) -> Result<Department>;

    /// Probabilities for one feature row, aligned to [`Department::ALL`].
    fn predict_probabilities(&self, features: &[f64]) -> Result<[f64; Department::COUNT]>;

    /// Write the trained model to `store`. `Ok(false)` when untrained.
    fn persist(&self, store: &dyn ModelStore, name: &str) -> Result<bool>;

    /// Replace the model with the one stored under `name`.
    /// `Ok(false)` when the resource does not exist.
    fn restore(&mut self, store: &dyn ModelStore, name: &str) -> Result<bool>;
}
