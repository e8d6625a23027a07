//! Model identifiers and construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error::{DeptClassError, Result};

use super::DepartmentClassifier;
use super::logistic::LogisticRegression;
use super::naive_bayes::MultinomialNaiveBayes;
use super::random_forest::RandomForest;
use super::svm::LinearSvm;
use super::variant::ClassifierVariant;

/// The registered classifier variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "MultinomialNB")]
    NaiveBayes,
    #[serde(rename = "SVM")]
    Svm,
    #[serde(rename = "RandomForest")]
    RandomForest,
    #[serde(rename = "LogisticRegression")]
    LogisticRegression,
}

impl ModelKind {
    /// Every registered kind, in registration order.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::NaiveBayes,
        ModelKind::Svm,
        ModelKind::RandomForest,
        ModelKind::LogisticRegression,
    ];

    /// Identifier used by callers and as the persisted resource stem.
    pub fn identifier(self) -> &'static str {
        match self {
            ModelKind::NaiveBayes => "MultinomialNB",
            ModelKind::Svm => "SVM",
            ModelKind::RandomForest => "RandomForest",
            ModelKind::LogisticRegression => "LogisticRegression",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::NaiveBayes => "Multinomial Naive Bayes",
            ModelKind::Svm => "Support Vector Machine",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::LogisticRegression => "Logistic Regression",
        }
    }

    /// Look up a kind by identifier, case-insensitively.
    ///
    /// `NaiveBayes` is accepted as an alias of `MultinomialNB`.
    pub fn from_identifier(id: &str) -> Option<ModelKind> {
        let id = id.trim();
        if id.eq_ignore_ascii_case("NaiveBayes") {
            return Some(ModelKind::NaiveBayes);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.identifier().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ModelKind {
    type Err = DeptClassError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_identifier(s).ok_or_else(|| {
            DeptClassError::unknown_model(format!(
                "'{s}' (available: {})",
                Self::ALL.map(ModelKind::identifier).join(", ")
            ))
        })
    }
}

/// Identifier and human-readable name of a registered model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub identifier: String,
    pub display_name: String,
}

impl From<ModelKind> for ModelInfo {
    fn from(kind: ModelKind) -> Self {
        Self {
            identifier: kind.identifier().to_string(),
            display_name: kind.display_name().to_string(),
        }
    }
}

/// Builds untrained classifiers with the configured hyperparameters.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    config: ClassifierConfig,
}

impl ModelRegistry {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Build an untrained classifier from its identifier.
    pub fn create(&self, identifier: &str) -> Result<Box<dyn DepartmentClassifier>> {
        let kind: ModelKind = identifier.parse()?;
        Ok(self.create_kind(kind))
    }

    /// Build an untrained classifier of `kind`.
    pub fn create_kind(&self, kind: ModelKind) -> Box<dyn DepartmentClassifier> {
        let config = &self.config;
        match kind {
            ModelKind::NaiveBayes => Box::new(ClassifierVariant::new(
                kind,
                MultinomialNaiveBayes::new(config.naive_bayes.clone()),
            )),
            ModelKind::Svm => Box::new(ClassifierVariant::new(
                kind,
                LinearSvm::new(config.svm.clone()),
            )),
            ModelKind::RandomForest => Box::new(ClassifierVariant::new(
                kind,
                RandomForest::new(config.random_forest.clone()),
            )),
            ModelKind::LogisticRegression => Box::new(ClassifierVariant::new(
                kind,
                LogisticRegression::new(config.logistic_regression.clone()),
            )),
        }
    }

    /// Every registered model, in registration order.
    pub fn list_available(&self) -> Vec<ModelInfo> {
        ModelKind::ALL.into_iter().map(ModelInfo::from).collect()
    }
}
