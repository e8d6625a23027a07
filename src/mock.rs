//! Mock predictor used when no trained model can answer.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classifier::algorithm::argmax;
use crate::classifier::round3;
use crate::department::Department;
use crate::engine::PredictionResult;
use crate::error::{DeptClassError, Result};

/// Department reported by the uniform fallback.
const FALLBACK_DEPARTMENT: Department = Department::IT;

/// Produces plausible-looking random predictions.
///
/// One department dominates with a raw score in `[0.6, 0.9]`; the others get
/// `[0.01, 0.2]`. Scores are normalized so they sum to 1.
#[derive(Debug)]
pub struct MockPredictor {
    rng: Mutex<StdRng>,
}

impl MockPredictor {
    /// Seeded predictors are reproducible; `None` seeds from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Generate a mock prediction. Never fails.
    pub fn generate(&self, question: &str, model_id: &str) -> PredictionResult {
        match self.try_generate(question, model_id) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Error generating mock prediction: {e}");
                Self::fallback(question, model_id, e.to_string())
            }
        }
    }

    fn try_generate(&self, question: &str, model_id: &str) -> Result<PredictionResult> {
        let mut raw = [0.0; Department::COUNT];
        {
            let mut rng = self.rng.lock();
            let dominant = rng.random_range(0..Department::COUNT);
            for (idx, score) in raw.iter_mut().enumerate() {
                let value = if idx == dominant {
                    rng.random_range(0.6..=0.9)
                } else {
                    rng.random_range(0.01..=0.2)
                };
                *score = round3(value);
            }
        }

        let sum: f64 = raw.iter().sum();
        if !(sum > 0.0 && sum.is_finite()) {
            return Err(DeptClassError::other(format!(
                "mock scores sum to {sum}"
            )));
        }
        let normalized = raw.map(|score| round3(score / sum));
        let best = argmax(&normalized)
            .ok_or_else(|| DeptClassError::other("no mock scores generated"))?;

        Ok(PredictionResult {
            question: question.to_string(),
            predicted_department: Department::ALL[best],
            model_used: model_id.to_string(),
            predictions: Department::ALL.into_iter().zip(normalized).collect(),
            confidence: normalized[best],
            is_mock: true,
            error: None,
        })
    }

    /// Uniform prediction returned when mock generation itself fails.
    pub fn fallback(question: &str, model_id: &str, error: impl Into<String>) -> PredictionResult {
        let uniform = 1.0 / Department::COUNT as f64;
        let predictions: BTreeMap<Department, f64> = Department::ALL
            .into_iter()
            .map(|department| (department, uniform))
            .collect();
        PredictionResult {
            question: question.to_string(),
            predicted_department: FALLBACK_DEPARTMENT,
            model_used: model_id.to_string(),
            predictions,
            confidence: uniform,
            is_mock: true,
            error: Some(error.into()),
        }
    }
}

impl Default for MockPredictor {
    fn default() -> Self {
        Self::new(None)
    }
}
