//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::logistic::LogisticRegressionParams;
use crate::classifier::naive_bayes::NaiveBayesParams;
use crate::classifier::random_forest::RandomForestParams;
use crate::classifier::registry::ModelKind;
use crate::classifier::svm::SvmParams;
use crate::error::{DeptClassError, Result};
use crate::vectorizer::VectorizerConfig;

/// Configuration for the classification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding persisted models.
    pub models_directory: PathBuf,
    /// Minimum number of labeled questions accepted by `train`.
    pub min_training_samples: usize,
    /// Model used when the caller does not name one.
    pub default_model: String,
    /// Seed for the mock predictor. `None` seeds from the OS.
    pub mock_seed: Option<u64>,
    /// Text vectorizer settings.
    pub vectorizer: VectorizerConfig,
    /// Hyperparameters of the registered classifiers.
    pub classifiers: ClassifierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_directory: PathBuf::from("saved_models"),
            min_training_samples: 10,
            default_model: ModelKind::NaiveBayes.identifier().to_string(),
            mock_seed: None,
            vectorizer: VectorizerConfig::default(),
            classifiers: ClassifierConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeptClassError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no engine can work with.
    pub fn validate(&self) -> Result<()> {
        if self.min_training_samples == 0 {
            return Err(DeptClassError::config(
                "min_training_samples must be at least 1",
            ));
        }
        if ModelKind::from_identifier(&self.default_model).is_none() {
            return Err(DeptClassError::config(format!(
                "default_model '{}' is not a registered model",
                self.default_model
            )));
        }
        self.vectorizer.validate()?;
        self.classifiers.validate()
    }
}

/// Hyperparameters for every registered classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub naive_bayes: NaiveBayesParams,
    pub svm: SvmParams,
    pub random_forest: RandomForestParams,
    pub logistic_regression: LogisticRegressionParams,
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        if self.naive_bayes.alpha < 0.0 {
            return Err(DeptClassError::config("naive_bayes.alpha must be >= 0"));
        }
        if self.svm.c <= 0.0 || self.svm.max_iter == 0 {
            return Err(DeptClassError::config(
                "svm.c must be > 0 and svm.max_iter > 0",
            ));
        }
        if self.random_forest.n_estimators == 0 || self.random_forest.min_samples_split < 2 {
            return Err(DeptClassError::config(
                "random_forest needs n_estimators > 0 and min_samples_split >= 2",
            ));
        }
        if self.logistic_regression.c <= 0.0 || self.logistic_regression.learning_rate <= 0.0 {
            return Err(DeptClassError::config(
                "logistic_regression.c and learning_rate must be > 0",
            ));
        }
        Ok(())
    }
}
