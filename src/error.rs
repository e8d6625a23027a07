//! Error types for the deptclass library.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the [`DeptClassError`] enum. The engine boundary is special: training
//! and classification report problems inside their return values instead of
//! returning errors, so these variants mostly surface from the vectorizer,
//! the classifier variants, the registry and the model store.
//!
//! # Examples
//!
//! ```
//! use deptclass::error::{DeptClassError, Result};
//!
//! fn check_samples(n: usize) -> Result<()> {
//!     if n < 10 {
//!         return Err(DeptClassError::validation("Need at least 10 samples for training"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_samples(3).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for deptclass operations.
#[derive(Error, Debug)]
pub enum DeptClassError {
    /// I/O errors (model directories, training data files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or insufficient training input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The vectorizer was used before it was fitted
    #[error("Vectorizer not fitted: {0}")]
    NotFitted(String),

    /// A classifier was used before it was trained
    #[error("Model not trained: {0}")]
    NotTrained(String),

    /// Unregistered model identifier
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Text could not be turned into features
    #[error("Vectorization error: {0}")]
    Vectorization(String),

    /// Feature vector does not match the trained feature space
    #[error("Invalid feature vector: {0}")]
    InvalidFeatureVector(String),

    /// An algorithm could not be fitted on the given data
    #[error("Model error: {0}")]
    Model(String),

    /// A persisted resource is missing, unreadable or unwritable
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with DeptClassError.
pub type Result<T> = std::result::Result<T, DeptClassError>;

impl DeptClassError {
    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Validation(msg.into())
    }

    /// Create a new not-fitted error.
    pub fn not_fitted<S: Into<String>>(msg: S) -> Self {
        DeptClassError::NotFitted(msg.into())
    }

    /// Create a new not-trained error.
    pub fn not_trained<S: Into<String>>(msg: S) -> Self {
        DeptClassError::NotTrained(msg.into())
    }

    /// Create a new unknown model error.
    pub fn unknown_model<S: Into<String>>(msg: S) -> Self {
        DeptClassError::UnknownModel(msg.into())
    }

    /// Create a new vectorization error.
    pub fn vectorization<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Vectorization(msg.into())
    }

    /// Create a new invalid feature vector error.
    pub fn invalid_features<S: Into<String>>(msg: S) -> Self {
        DeptClassError::InvalidFeatureVector(msg.into())
    }

    /// Create a new model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Model(msg.into())
    }

    /// Create a new persistence error.
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Persistence(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DeptClassError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = DeptClassError::validation("too few samples");
        assert_eq!(error.to_string(), "Validation error: too few samples");

        let error = DeptClassError::unknown_model("Perceptron");
        assert_eq!(error.to_string(), "Unknown model: Perceptron");

        let error = DeptClassError::not_fitted("call fit first");
        assert_eq!(error.to_string(), "Vectorizer not fitted: call fit first");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = DeptClassError::from(io_error);

        match error {
            DeptClassError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
