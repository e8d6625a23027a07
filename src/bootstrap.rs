//! Startup routine: load saved models, or train on the sample corpus.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{ClassificationEngine, PersistenceOutcome, TrainingOutcome};
use crate::sample_data;

/// Fewer loaded components than this triggers training on the sample corpus.
const MIN_LOADED_COMPONENTS: usize = 2;

/// What [`initialize`] did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub load: PersistenceOutcome,
    /// Present when the sample corpus was used.
    pub training: Option<TrainingOutcome>,
    /// Present when freshly trained models were saved.
    pub save: Option<PersistenceOutcome>,
}

impl BootstrapReport {
    /// Whether the engine came out of bootstrap with loaded or trained models.
    pub fn is_ready(&self) -> bool {
        match &self.training {
            Some(training) => training.success,
            None => true,
        }
    }
}

/// Bring `engine` into a usable state.
///
/// Loads models from `directory`. If fewer than two components load, trains
/// on the bundled sample corpus and saves the result back to `directory`.
/// Failures are logged; the engine keeps serving mock predictions.
pub fn initialize<P: AsRef<Path>>(engine: &ClassificationEngine, directory: P) -> BootstrapReport {
    let directory = directory.as_ref();
    log::info!("Initializing classification engine from {}", directory.display());

    let load = engine.load(directory);
    if load.success && load.components.len() >= MIN_LOADED_COMPONENTS {
        log::info!("Successfully loaded existing models from disk");
        return BootstrapReport {
            load,
            training: None,
            save: None,
        };
    }

    log::info!("No existing models found. Training with sample data...");
    let (questions, departments) = sample_data::training_set();
    let training = engine.train(&questions, &departments);
    if !training.success {
        log::error!("Failed to train models on startup: {}", training.message);
        return BootstrapReport {
            load,
            training: Some(training),
            save: None,
        };
    }
    log::info!("Models trained successfully on startup");

    let save = engine.save(directory);
    if save.success {
        log::info!("Models saved to disk successfully");
    } else {
        log::warn!("Failed to save models: {}", save.message);
    }

    BootstrapReport {
        load,
        training: Some(training),
        save: Some(save),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> ClassificationEngine {
        ClassificationEngine::new(EngineConfig {
            mock_seed: Some(1),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_directory_trains_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine();
        let report = initialize(&engine, dir.path());

        assert!(report.is_ready());
        assert!(report.load.components.is_empty());
        assert_eq!(report.training.as_ref().map(|t| t.total_samples), Some(50));
        assert!(report.save.as_ref().is_some_and(|s| s.success));
        assert!(dir.path().join("vectorizer.bin").exists());
        assert!(dir.path().join("MultinomialNB.bin").exists());
    }

    #[test]
    fn test_saved_models_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        initialize(&engine(), dir.path());

        let engine = engine();
        let report = initialize(&engine, dir.path());
        assert!(report.training.is_none());
        assert_eq!(report.load.components.len(), 5);
        assert!(engine.status().models.iter().all(|m| m.is_trained));
    }
}
