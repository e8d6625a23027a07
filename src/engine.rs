//! Department classification engine.
//!
//! The engine owns one shared [`TfIdfVectorizer`] and one trained classifier
//! per registered [`ModelKind`]. Classification never fails: whenever no
//! trained model can answer, the [`MockPredictor`] does.
//!
//! Readers (`classify`, `status`, `save`) share a read lock. Writers
//! (`train`, `load`) are serialized by a separate mutex, do their expensive
//! work without blocking readers, and swap the new state in under a short
//! write lock. Readers therefore see either the old or the new state.
//!
//! # Example
//!
//! ```
//! use deptclass::engine::ClassificationEngine;
//! use deptclass::sample_data;
//!
//! let engine = ClassificationEngine::default();
//! let (questions, departments) = sample_data::training_set();
//! let outcome = engine.train(&questions, &departments);
//! assert!(outcome.success);
//!
//! let result = engine.classify("How do I reset my password?", "RandomForest");
//! assert!(!result.is_mock);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::classifier::{
    DepartmentClassifier, ModelInfo, ModelKind, ModelRegistry, TrainingReport, round3,
};
use crate::config::EngineConfig;
use crate::department::Department;
use crate::error::{DeptClassError, Result};
use crate::mock::MockPredictor;
use crate::persistence::{FileModelStore, ModelStore, resource_name};
use crate::vectorizer::{TfIdfVectorizer, VECTORIZER_COMPONENT};

/// Result of classifying one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub question: String,
    pub predicted_department: Department,
    /// Model identifier as requested by the caller.
    pub model_used: String,
    /// Probability per department, all five present.
    pub predictions: BTreeMap<Department, f64>,
    /// Probability of the predicted department.
    pub confidence: f64,
    /// True when the mock predictor produced this result.
    pub is_mock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of [`ClassificationEngine::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub success: bool,
    pub message: String,
    /// One report per registered model, in registry order.
    pub results: Vec<TrainingReport>,
    pub total_samples: usize,
    /// Distinct departments of the training set, in fixed order.
    pub departments: Vec<Department>,
}

impl TrainingOutcome {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            results: Vec::new(),
            total_samples: 0,
            departments: Vec::new(),
        }
    }
}

/// Status of one registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub identifier: String,
    pub display_name: String,
    /// The engine holds a trained handle for this model.
    ///
    /// A handle kept after a failed retrain stays `true` here even though
    /// it no longer matches the vectorizer and `classify` answers for it
    /// with mock predictions.
    pub is_trained: bool,
    pub available: bool,
}

/// Snapshot returned by [`ClassificationEngine::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub models: Vec<ModelStatus>,
    pub vectorizer_fitted: bool,
    pub total_departments: usize,
    pub departments: Vec<Department>,
}

/// Outcome of a save or load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceOutcome {
    /// True when no component failed.
    pub success: bool,
    pub message: String,
    /// Components written or read (`vectorizer` and model identifiers).
    pub components: Vec<String>,
    /// One message per failed component.
    pub errors: Vec<String>,
}

struct EngineState {
    vectorizer: TfIdfVectorizer,
    models: AHashMap<ModelKind, Box<dyn DepartmentClassifier>>,
}

/// The department classification engine.
pub struct ClassificationEngine {
    config: EngineConfig,
    registry: ModelRegistry,
    state: RwLock<EngineState>,
    /// Serializes `train` and `load`.
    writer: Mutex<()>,
    mock: MockPredictor,
}

impl std::fmt::Debug for ClassificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ClassificationEngine")
            .field("vectorizer", &state.vectorizer)
            .field("trained_models", &state.models.len())
            .finish()
    }
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl ClassificationEngine {
    /// Create an untrained engine.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            registry: ModelRegistry::new(config.classifiers.clone()),
            state: RwLock::new(EngineState {
                vectorizer: TfIdfVectorizer::new(config.vectorizer.clone()),
                models: AHashMap::new(),
            }),
            writer: Mutex::new(()),
            mock: MockPredictor::new(config.mock_seed),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn validate_training_set<Q: AsRef<str>, D: AsRef<str>>(
        &self,
        questions: &[Q],
        departments: &[D],
    ) -> Result<Vec<Department>> {
        if questions.len() != departments.len() {
            return Err(DeptClassError::validation(format!(
                "Questions and departments must have the same length ({} vs {})",
                questions.len(),
                departments.len()
            )));
        }
        let min = self.config.min_training_samples;
        if questions.len() < min {
            return Err(DeptClassError::validation(format!(
                "Need at least {min} samples for training, got {}",
                questions.len()
            )));
        }
        departments.iter().map(|d| d.as_ref().parse()).collect()
    }

    /// Train every registered model on a labeled question set.
    ///
    /// Invalid input leaves the engine untouched. A model that fails to
    /// train is reported in its own entry; the others are still installed.
    pub fn train<Q: AsRef<str>, D: AsRef<str>>(
        &self,
        questions: &[Q],
        departments: &[D],
    ) -> TrainingOutcome {
        let _writer = self.writer.lock();

        let labels = match self.validate_training_set(questions, departments) {
            Ok(labels) => labels,
            Err(e) => {
                log::warn!("Rejected training set: {e}");
                return TrainingOutcome::rejected(format!("Training failed: {e}"));
            }
        };

        let mut vectorizer = TfIdfVectorizer::new(self.config.vectorizer.clone());
        let features = match vectorizer.fit_transform(questions) {
            Ok(features) => features,
            Err(e) => {
                log::error!("Error training models: {e}");
                return TrainingOutcome::rejected(format!("Training failed: {e}"));
            }
        };
        log::info!(
            "Vectorizer fitted: {} samples, {} features",
            features.n_samples(),
            features.n_features()
        );

        let mut results = Vec::with_capacity(ModelKind::ALL.len());
        let mut trained = Vec::with_capacity(ModelKind::ALL.len());
        for kind in ModelKind::ALL {
            let mut classifier = self.registry.create_kind(kind);
            let report = classifier.train(&features, &labels);
            if report.is_trained() {
                trained.push(classifier);
            }
            results.push(report);
        }

        {
            let mut state = self.state.write();
            state.vectorizer = vectorizer;
            for classifier in trained {
                state.models.insert(classifier.kind(), classifier);
            }
            let stale: Vec<&str> = results
                .iter()
                .filter(|r| !r.is_trained())
                .filter_map(|r| ModelKind::from_identifier(&r.model_type))
                .filter(|kind| state.models.contains_key(kind))
                .map(ModelKind::identifier)
                .collect();
            if !stale.is_empty() {
                log::warn!(
                    "Kept previous models for {} after failed retraining; \
                     they were fitted on another vocabulary and will answer with mock predictions",
                    stale.join(", ")
                );
            }
        }

        let departments: Vec<Department> = Department::ALL
            .into_iter()
            .filter(|d| labels.contains(d))
            .collect();

        TrainingOutcome {
            success: true,
            message: "Models trained successfully".to_string(),
            results,
            total_samples: labels.len(),
            departments,
        }
    }

    /// Classify a question with the model named `model_id`.
    ///
    /// Falls back to a mock prediction when the model is unknown or
    /// untrained, the vectorizer is not fitted, or prediction fails.
    pub fn classify(&self, question: &str, model_id: &str) -> PredictionResult {
        match self.try_classify(question, model_id) {
            Ok(Some(result)) => result,
            Ok(None) => self.mock.generate(question, model_id),
            Err(e) => {
                log::warn!("Error classifying question with {model_id}: {e}");
                self.mock.generate(question, model_id)
            }
        }
    }

    /// Classify with the configured default model.
    pub fn classify_default(&self, question: &str) -> PredictionResult {
        self.classify(question, &self.config.default_model)
    }

    /// `Ok(None)` when no trained model can answer.
    fn try_classify(&self, question: &str, model_id: &str) -> Result<Option<PredictionResult>> {
        let Some(kind) = ModelKind::from_identifier(model_id) else {
            log::debug!("Unknown model '{model_id}', using mock prediction");
            return Ok(None);
        };

        let state = self.state.read();
        let Some(classifier) = state.models.get(&kind) else {
            log::debug!("{kind} is not trained, using mock prediction");
            return Ok(None);
        };
        if !state.vectorizer.is_fitted() {
            log::debug!("Vectorizer is not fitted, using mock prediction");
            return Ok(None);
        }

        check_vocabulary(&**classifier, &state.vectorizer)?;

        let features = state.vectorizer.transform_one(question);
        let label = classifier.predict(&features)?;
        let raw = classifier.predict_probabilities(&features)?;
        drop(state);

        let sum: f64 = raw.iter().sum();
        if !(sum > 0.0 && sum.is_finite()) {
            return Err(DeptClassError::model(format!(
                "{kind} returned degenerate probabilities"
            )));
        }
        let probabilities = raw.map(|p| round3(p / sum));
        let predicted = pick_department(&probabilities, label);

        log::debug!("{kind} classified question as {predicted}");
        Ok(Some(PredictionResult {
            question: question.to_string(),
            predicted_department: predicted,
            model_used: model_id.to_string(),
            predictions: Department::ALL.into_iter().zip(probabilities).collect(),
            confidence: probabilities[predicted.index()],
            is_mock: false,
            error: None,
        }))
    }

    /// Per-model training status.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.state.read();
        let models = ModelKind::ALL
            .into_iter()
            .map(|kind| ModelStatus {
                identifier: kind.identifier().to_string(),
                display_name: kind.display_name().to_string(),
                is_trained: state.models.get(&kind).is_some_and(|m| m.is_trained()),
                available: true,
            })
            .collect();
        StatusSnapshot {
            models,
            vectorizer_fitted: state.vectorizer.is_fitted(),
            total_departments: Department::COUNT,
            departments: Department::ALL.to_vec(),
        }
    }

    pub fn list_departments(&self) -> Vec<Department> {
        Department::ALL.to_vec()
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.registry.list_available()
    }

    /// Save the fitted vectorizer and every trained model into `directory`.
    pub fn save<P: AsRef<Path>>(&self, directory: P) -> PersistenceOutcome {
        let directory = directory.as_ref();
        match FileModelStore::create(directory) {
            Ok(store) => self.save_into(&store, &directory.display().to_string()),
            Err(e) => {
                log::error!("Error saving models: {e}");
                PersistenceOutcome {
                    success: false,
                    message: format!("Failed to save models: {e}"),
                    components: Vec::new(),
                    errors: vec![e.to_string()],
                }
            }
        }
    }

    /// Save into an arbitrary store.
    pub fn save_to(&self, store: &dyn ModelStore) -> PersistenceOutcome {
        self.save_into(store, "model store")
    }

    fn save_into(&self, store: &dyn ModelStore, location: &str) -> PersistenceOutcome {
        let state = self.state.read();
        let mut components = Vec::new();
        let mut errors = Vec::new();

        match state
            .vectorizer
            .persist(store, &resource_name(VECTORIZER_COMPONENT))
        {
            Ok(true) => components.push(VECTORIZER_COMPONENT.to_string()),
            Ok(false) => {}
            Err(e) => errors.push(format!("{VECTORIZER_COMPONENT}: {e}")),
        }

        for kind in ModelKind::ALL {
            let Some(classifier) = state.models.get(&kind) else {
                continue;
            };
            match classifier.persist(store, &resource_name(kind.identifier())) {
                Ok(true) => components.push(kind.identifier().to_string()),
                Ok(false) => {}
                Err(e) => errors.push(format!("{kind}: {e}")),
            }
        }

        for error in &errors {
            log::warn!("Error saving {error}");
        }
        log::info!("Saved {} components to {location}", components.len());
        finish_outcome("saved to", "save", location, components, errors)
    }

    /// Load the vectorizer and models previously saved into `directory`.
    ///
    /// Missing resources leave the matching component untrained. If at
    /// least one component loads, the engine state becomes exactly the
    /// loaded components; otherwise it is left as it was.
    pub fn load<P: AsRef<Path>>(&self, directory: P) -> PersistenceOutcome {
        let directory = directory.as_ref();
        let store = FileModelStore::open(directory);
        self.load_from_store(&store, &directory.display().to_string())
    }

    /// Load from an arbitrary store.
    pub fn load_from(&self, store: &dyn ModelStore) -> PersistenceOutcome {
        self.load_from_store(store, "model store")
    }

    fn load_from_store(&self, store: &dyn ModelStore, location: &str) -> PersistenceOutcome {
        let _writer = self.writer.lock();
        let mut components = Vec::new();
        let mut errors = Vec::new();

        let mut vectorizer = TfIdfVectorizer::new(self.config.vectorizer.clone());
        match vectorizer.restore(store, &resource_name(VECTORIZER_COMPONENT)) {
            Ok(true) => components.push(VECTORIZER_COMPONENT.to_string()),
            Ok(false) => {}
            Err(e) => errors.push(format!("{VECTORIZER_COMPONENT}: {e}")),
        }

        let mut models = AHashMap::new();
        for kind in ModelKind::ALL {
            let mut classifier = self.registry.create_kind(kind);
            match classifier.restore(store, &resource_name(kind.identifier())) {
                Ok(true) => {
                    if vectorizer.is_fitted()
                        && check_vocabulary(&*classifier, &vectorizer).is_err()
                    {
                        log::warn!("{kind} was trained on a different vocabulary");
                    }
                    components.push(kind.identifier().to_string());
                    models.insert(kind, classifier);
                }
                Ok(false) => {}
                Err(e) => errors.push(format!("{kind}: {e}")),
            }
        }

        for error in &errors {
            log::warn!("Error loading {error}");
        }

        if components.is_empty() {
            log::info!("No models found in {location}");
        } else {
            let mut state = self.state.write();
            state.vectorizer = vectorizer;
            state.models = models;
            log::info!("Loaded {} components from {location}", components.len());
        }

        finish_outcome("loaded from", "load", location, components, errors)
    }
}

/// Fails unless `classifier` was trained on the vocabulary `vectorizer` holds.
fn check_vocabulary(
    classifier: &dyn DepartmentClassifier,
    vectorizer: &TfIdfVectorizer,
) -> Result<()> {
    let trained_on = classifier.metadata().map(|m| m.vocabulary_fingerprint);
    if trained_on != Some(vectorizer.fingerprint()) {
        return Err(DeptClassError::invalid_features(format!(
            "{} was trained on a different vocabulary",
            classifier.kind()
        )));
    }
    Ok(())
}

/// Argmax of `probabilities`; ties prefer `preferred`, then fixed order.
fn pick_department(probabilities: &[f64; Department::COUNT], preferred: Department) -> Department {
    let max = probabilities
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if probabilities[preferred.index()] == max {
        return preferred;
    }
    Department::ALL
        .into_iter()
        .find(|d| probabilities[d.index()] == max)
        .unwrap_or(preferred)
}

fn finish_outcome(
    done: &str,
    verb: &str,
    location: &str,
    components: Vec<String>,
    errors: Vec<String>,
) -> PersistenceOutcome {
    let success = errors.is_empty();
    let message = if success {
        format!("Models {done} {location}")
    } else {
        format!("Failed to {verb} {} component(s) at {location}", errors.len())
    };
    PersistenceOutcome {
        success,
        message,
        components,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryModelStore;
    use crate::sample_data;

    fn seeded_engine() -> ClassificationEngine {
        ClassificationEngine::new(EngineConfig {
            mock_seed: Some(7),
            ..Default::default()
        })
        .unwrap()
    }

    fn trained_engine() -> ClassificationEngine {
        let engine = seeded_engine();
        let (questions, departments) = sample_data::training_set();
        assert!(engine.train(&questions, &departments).success);
        engine
    }

    #[test]
    fn test_untrained_engine_uses_mock() {
        let engine = seeded_engine();
        let result = engine.classify("How do I reset my password?", "SVM");
        assert!(result.is_mock);
        assert_eq!(result.model_used, "SVM");
        assert_eq!(result.predictions.len(), Department::COUNT);

        let status = engine.status();
        assert!(!status.vectorizer_fitted);
        assert!(status.models.iter().all(|m| !m.is_trained && m.available));
        assert_eq!(status.total_departments, 5);
    }

    #[test]
    fn test_rejected_training_sets() {
        let engine = seeded_engine();

        let outcome = engine.train(&["a", "b"], &["IT"]);
        assert!(!outcome.success);
        assert!(outcome.results.is_empty());

        let outcome = engine.train(&["How do I reset my password?"; 3], &["IT"; 3]);
        assert!(!outcome.success);
        assert!(outcome.message.contains("at least 10"));

        let outcome = engine.train(&["Where is the printer?"; 10], &["Legal"; 10]);
        assert!(!outcome.success);

        assert!(!engine.status().vectorizer_fitted);
    }

    #[test]
    fn test_train_reports_every_model() {
        let engine = seeded_engine();
        let (questions, departments) = sample_data::training_set();
        let outcome = engine.train(&questions, &departments);

        assert!(outcome.success);
        assert_eq!(outcome.total_samples, 50);
        assert_eq!(outcome.departments, Department::ALL.to_vec());
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.model_type.as_str()).collect();
        assert_eq!(ids, ["MultinomialNB", "SVM", "RandomForest", "LogisticRegression"]);
        for report in &outcome.results {
            assert!(report.is_trained(), "{report:?}");
            assert!((0.0..=1.0).contains(&report.accuracy));
        }
        assert!(engine.status().models.iter().all(|m| m.is_trained));
    }

    #[test]
    fn test_trained_prediction_invariants() {
        let engine = trained_engine();
        for model in engine.list_models() {
            let result = engine.classify("How do I submit my expense report?", &model.identifier);
            assert!(!result.is_mock);
            assert_eq!(result.predictions.len(), Department::COUNT);
            let max = result.predictions.values().copied().fold(0.0, f64::max);
            assert_eq!(result.confidence, max);
            assert_eq!(result.predictions[&result.predicted_department], max);
            assert!(result.predictions.values().all(|&p| (0.0..=1.0).contains(&p)));
            let sum: f64 = result.predictions.values().sum();
            assert!((sum - 1.0).abs() <= 0.005);
        }
    }

    #[test]
    fn test_model_ids_are_case_insensitive() {
        let engine = trained_engine();
        let result = engine.classify("What is our sales target?", "svm");
        assert!(!result.is_mock);
        assert_eq!(result.model_used, "svm");

        let result = engine.classify("What is our sales target?", "Perceptron");
        assert!(result.is_mock);
        assert_eq!(result.model_used, "Perceptron");
    }

    #[test]
    fn test_classify_default() {
        let engine = trained_engine();
        let result = engine.classify_default("How many vacation days do I have?");
        assert_eq!(result.model_used, "MultinomialNB");
        assert!(!result.is_mock);
    }

    #[test]
    fn test_save_and_load_through_store() {
        let engine = trained_engine();
        let store = MemoryModelStore::new();
        let saved = engine.save_to(&store);
        assert!(saved.success, "{saved:?}");
        assert_eq!(saved.components.len(), 5);
        assert!(store.exists("vectorizer.bin"));
        assert!(store.exists("LogisticRegression.bin"));

        let fresh = seeded_engine();
        let loaded = fresh.load_from(&store);
        assert!(loaded.success);
        assert_eq!(loaded.components, saved.components);
        assert_eq!(fresh.status(), engine.status());

        let question = "How do I reset my password?";
        assert_eq!(
            fresh.classify(question, "SVM").predictions,
            engine.classify(question, "SVM").predictions
        );
    }

    #[test]
    fn test_load_from_empty_store_keeps_state() {
        let engine = trained_engine();
        let outcome = engine.load_from(&MemoryModelStore::new());
        assert!(outcome.success);
        assert!(outcome.components.is_empty());
        assert!(engine.status().vectorizer_fitted);
    }

    #[test]
    fn test_partial_load_replaces_state() {
        let engine = trained_engine();
        let store = MemoryModelStore::new();
        engine.save_to(&store);
        store.delete("SVM.bin").unwrap();
        store.write("RandomForest.bin", b"corrupt").unwrap();

        let target = trained_engine();
        let outcome = target.load_from(&store);
        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("RandomForest"));

        let status = target.status();
        let trained: Vec<&str> = status
            .models
            .iter()
            .filter(|m| m.is_trained)
            .map(|m| m.identifier.as_str())
            .collect();
        assert_eq!(trained, ["MultinomialNB", "LogisticRegression"]);
        assert!(target.classify("anything", "SVM").is_mock);
    }

    #[test]
    fn test_pick_department_prefers_model_label_on_ties() {
        let probabilities = [0.4, 0.1, 0.4, 0.05, 0.05];
        assert_eq!(pick_department(&probabilities, Department::IT), Department::IT);
        assert_eq!(pick_department(&probabilities, Department::Sales), Department::HR);
    }
}
