//! # deptclass
//!
//! Classifies free-text questions into organizational departments (HR,
//! Finance, IT, Production, Sales) with an ensemble of four interchangeable
//! text classifiers.
//!
//! ## Features
//!
//! - TF-IDF text vectorization with English stop words and bigrams
//! - Multinomial naive Bayes, linear SVM, random forest and logistic
//!   regression behind one classifier contract
//! - Mock predictions whenever no trained model can answer
//! - Versioned binary persistence of every trained component
//! - Startup bootstrap from saved models or the bundled sample corpus

pub mod analysis;
pub mod bootstrap;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod department;
pub mod engine;
pub mod error;
pub mod mock;
pub mod persistence;
pub mod sample_data;
pub mod vectorizer;

pub mod prelude {
    pub use crate::classifier::{DepartmentClassifier, ModelKind, ModelRegistry};
    pub use crate::config::EngineConfig;
    pub use crate::department::Department;
    pub use crate::engine::{ClassificationEngine, PredictionResult, TrainingOutcome};
    pub use crate::error::{DeptClassError, Result};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
