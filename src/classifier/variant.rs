//! Generic classifier variant.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::department::Department;
use crate::error::{DeptClassError, Result};
use crate::persistence::{ModelStore, decode_component, encode_component};
use crate::vectorizer::FeatureMatrix;

use super::algorithm::ClassifierAlgorithm;
use super::registry::ModelKind;
use super::{DepartmentClassifier, ModelMetadata, STATUS_TRAINED, TrainingReport, round3};

/// A trained algorithm together with what it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainedModel<A> {
    /// Class index -> department.
    classes: Vec<Department>,
    n_features: usize,
    algorithm: A,
    metadata: ModelMetadata,
}

/// Wraps one [`ClassifierAlgorithm`] behind the [`DepartmentClassifier`]
/// contract.
///
/// Training always fits a fresh copy of the configured algorithm and only
/// replaces the current model once that fit succeeded.
#[derive(Debug, Clone)]
pub struct ClassifierVariant<A: ClassifierAlgorithm> {
    kind: ModelKind,
    /// Unfitted algorithm carrying the hyperparameters.
    template: A,
    trained: Option<TrainedModel<A>>,
}

impl<A: ClassifierAlgorithm> ClassifierVariant<A> {
    pub fn new(kind: ModelKind, algorithm: A) -> Self {
        Self {
            kind,
            template: algorithm,
            trained: None,
        }
    }

    fn trained_model(&self) -> Result<&TrainedModel<A>> {
        self.trained.as_ref().ok_or_else(|| {
            DeptClassError::not_trained(format!("{} is not trained", self.kind.identifier()))
        })
    }

    fn check_width(model: &TrainedModel<A>, features: &[f64]) -> Result<()> {
        if features.len() != model.n_features {
            return Err(DeptClassError::invalid_features(format!(
                "expected {} features, got {}",
                model.n_features,
                features.len()
            )));
        }
        Ok(())
    }

    fn fit(&self, features: &FeatureMatrix, labels: &[Department]) -> Result<TrainedModel<A>> {
        if features.n_samples() != labels.len() {
            return Err(DeptClassError::validation(format!(
                "{} feature rows but {} labels",
                features.n_samples(),
                labels.len()
            )));
        }

        let classes: Vec<Department> = Department::ALL
            .into_iter()
            .filter(|d| labels.contains(d))
            .collect();
        let indices: Vec<usize> = labels
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or_default())
            .collect();

        let mut algorithm = self.template.clone();
        algorithm.fit(features, &indices, classes.len())?;

        let mut correct = 0usize;
        for (row, &expected) in features.rows().iter().zip(&indices) {
            if algorithm.predict_label(row)? == expected {
                correct += 1;
            }
        }
        let accuracy = round3(correct as f64 / labels.len() as f64);

        Ok(TrainedModel {
            classes,
            n_features: features.n_features(),
            algorithm,
            metadata: ModelMetadata {
                model_type: self.kind.identifier().to_string(),
                trained_at: Utc::now(),
                training_samples: labels.len(),
                n_features: features.n_features(),
                vocabulary_fingerprint: features.vocabulary_fingerprint(),
                accuracy,
            },
        })
    }
}

impl<A: ClassifierAlgorithm + 'static> DepartmentClassifier for ClassifierVariant<A> {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    fn classes(&self) -> &[Department] {
        self.trained
            .as_ref()
            .map_or(&[][..], |m| m.classes.as_slice())
    }

    fn metadata(&self) -> Option<&ModelMetadata> {
        self.trained.as_ref().map(|m| &m.metadata)
    }

    fn train(&mut self, features: &FeatureMatrix, labels: &[Department]) -> TrainingReport {
        let start = Instant::now();
        let model_type = self.kind.identifier().to_string();

        match self.fit(features, labels) {
            Ok(model) => {
                let accuracy = model.metadata.accuracy;
                self.trained = Some(model);
                let training_time_ms = start.elapsed().as_millis() as u64;
                log::info!(
                    "{model_type} trained on {} samples, accuracy {accuracy:.3} ({training_time_ms} ms)",
                    labels.len()
                );
                TrainingReport {
                    model_type,
                    accuracy,
                    status: STATUS_TRAINED.to_string(),
                    training_samples: labels.len(),
                    training_time_ms,
                }
            }
            Err(e) => {
                log::error!("Error training {model_type}: {e}");
                TrainingReport {
                    model_type,
                    accuracy: 0.0,
                    status: format!("error: {e}"),
                    training_samples: labels.len(),
                    training_time_ms: start.elapsed().as_millis() as u64,
                }
            }
        }
    }

    fn predict(&self, features: &[f64]) -> Result<Department> {
        let model = self.trained_model()?;
        Self::check_width(model, features)?;
        let idx = model.algorithm.predict_label(features)?;
        model
            .classes
            .get(idx)
            .copied()
            .ok_or_else(|| DeptClassError::model(format!("class index {idx} out of range")))
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<[f64; Department::COUNT]> {
        let model = self.trained_model()?;
        Self::check_width(model, features)?;

        if !model.algorithm.supports_probabilities() {
            return Ok([1.0 / Department::COUNT as f64; Department::COUNT]);
        }

        let probabilities = model.algorithm.predict_probabilities(features)?;
        let mut aligned = [0.0; Department::COUNT];
        for (department, p) in model.classes.iter().zip(probabilities) {
            aligned[department.index()] = p;
        }
        Ok(aligned)
    }

    fn persist(&self, store: &dyn ModelStore, name: &str) -> Result<bool> {
        let Some(model) = &self.trained else {
            return Ok(false);
        };
        let bytes = encode_component(self.kind.identifier(), model)?;
        store.write(name, &bytes)?;
        Ok(true)
    }

    fn restore(&mut self, store: &dyn ModelStore, name: &str) -> Result<bool> {
        if !store.exists(name) {
            return Ok(false);
        }
        let bytes = store.read(name)?;
        let model: TrainedModel<A> = decode_component(self.kind.identifier(), &bytes)?;
        if model.classes.is_empty() || model.metadata.n_features != model.n_features {
            return Err(DeptClassError::persistence(format!(
                "{name} holds an inconsistent {} model",
                self.kind.identifier()
            )));
        }
        self.trained = Some(model);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::naive_bayes::{MultinomialNaiveBayes, NaiveBayesParams};
    use crate::persistence::MemoryModelStore;

    /// Always answers with the most frequent training class and offers no
    /// probability estimates.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct MajorityClass {
        label: usize,
        n_classes: usize,
    }

    impl ClassifierAlgorithm for MajorityClass {
        fn fit(&mut self, _features: &FeatureMatrix, labels: &[usize], n_classes: usize) -> Result<()> {
            let mut counts = vec![0usize; n_classes];
            for &label in labels {
                counts[label] += 1;
            }
            self.label = counts
                .iter()
                .enumerate()
                .max_by_key(|&(idx, &count)| (count, std::cmp::Reverse(idx)))
                .map(|(idx, _)| idx)
                .unwrap_or_default();
            self.n_classes = n_classes;
            Ok(())
        }

        fn predict_probabilities(&self, _features: &[f64]) -> Result<Vec<f64>> {
            Err(DeptClassError::model("no probability estimates"))
        }

        fn predict_label(&self, _features: &[f64]) -> Result<usize> {
            Ok(self.label)
        }

        fn supports_probabilities(&self) -> bool {
            false
        }
    }

    fn training_data() -> (FeatureMatrix, Vec<Department>) {
        let rows = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
        ];
        let labels = vec![
            Department::Sales,
            Department::Sales,
            Department::HR,
            Department::HR,
        ];
        (FeatureMatrix::new(rows, 2).unwrap(), labels)
    }

    fn naive_bayes() -> ClassifierVariant<MultinomialNaiveBayes> {
        ClassifierVariant::new(
            ModelKind::NaiveBayes,
            MultinomialNaiveBayes::new(NaiveBayesParams::default()),
        )
    }

    #[test]
    fn test_untrained_variant() {
        let variant = naive_bayes();
        assert!(!variant.is_trained());
        assert!(variant.classes().is_empty());
        assert!(matches!(
            variant.predict(&[1.0, 0.0]),
            Err(DeptClassError::NotTrained(_))
        ));
    }

    #[test]
    fn test_train_and_align_probabilities() {
        let (features, labels) = training_data();
        let mut variant = naive_bayes();
        let report = variant.train(&features, &labels);

        assert!(report.is_trained());
        assert_eq!(report.model_type, "MultinomialNB");
        assert_eq!(report.training_samples, 4);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(variant.classes(), &[Department::HR, Department::Sales]);

        let p = variant.predict_probabilities(&[1.0, 0.0]).unwrap();
        assert_eq!(p[Department::Finance.index()], 0.0);
        assert_eq!(p[Department::IT.index()], 0.0);
        assert!(p[Department::Sales.index()] > p[Department::HR.index()]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(variant.predict(&[0.0, 1.0]).unwrap(), Department::HR);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (features, labels) = training_data();
        let mut variant = naive_bayes();
        variant.train(&features, &labels);
        assert!(matches!(
            variant.predict_probabilities(&[1.0, 0.0, 0.0]),
            Err(DeptClassError::InvalidFeatureVector(_))
        ));
    }

    #[test]
    fn test_failed_training_keeps_previous_model() {
        let (features, labels) = training_data();
        let mut variant = naive_bayes();
        variant.train(&features, &labels);

        let negative = FeatureMatrix::new(vec![vec![-1.0, 0.0], vec![0.0, 1.0]], 2).unwrap();
        let report = variant.train(&negative, &[Department::IT, Department::HR]);
        assert!(!report.is_trained());
        assert!(report.status.starts_with("error: "));
        assert_eq!(report.accuracy, 0.0);

        assert!(variant.is_trained());
        assert_eq!(variant.classes(), &[Department::HR, Department::Sales]);
    }

    #[test]
    fn test_uniform_probabilities_without_estimates() {
        let (features, labels) = training_data();
        let mut variant = ClassifierVariant::new(ModelKind::Svm, MajorityClass::default());
        assert!(variant.train(&features, &labels).is_trained());

        let p = variant.predict_probabilities(&[1.0, 0.0]).unwrap();
        assert!(p.iter().all(|&v| (v - 0.2).abs() < 1e-12));
        assert_eq!(variant.predict(&[1.0, 0.0]).unwrap(), Department::HR);
    }

    #[test]
    fn test_persist_and_restore() {
        let store = MemoryModelStore::new();
        let untrained = naive_bayes();
        assert!(!untrained.persist(&store, "MultinomialNB.bin").unwrap());

        let (features, labels) = training_data();
        let mut variant = naive_bayes();
        variant.train(&features, &labels);
        assert!(variant.persist(&store, "MultinomialNB.bin").unwrap());

        let mut restored = naive_bayes();
        assert!(!restored.restore(&store, "missing.bin").unwrap());
        assert!(restored.restore(&store, "MultinomialNB.bin").unwrap());
        assert_eq!(restored.classes(), variant.classes());
        assert_eq!(
            restored.predict_probabilities(&[0.3, 0.7]).unwrap(),
            variant.predict_probabilities(&[0.3, 0.7]).unwrap()
        );
    }
}
