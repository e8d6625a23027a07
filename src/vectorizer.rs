//! TF-IDF vectorizer for question text.
//!
//! One vectorizer is shared by every classifier in the engine, so all of them
//! train and predict in the same feature space.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analysis::TextAnalyzer;
use crate::error::{DeptClassError, Result};
use crate::persistence::{ModelStore, decode_component, encode_component};

/// Component name used when persisting the vectorizer.
pub const VECTORIZER_COMPONENT: &str = "vectorizer";

/// Vectorizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Upper bound on vocabulary size; the most frequent terms are kept.
    pub max_features: usize,
    /// Inclusive n-gram range.
    pub ngram_range: (usize, usize),
    /// Lower-case text before tokenizing.
    pub lowercase: bool,
    /// Drop English stop words.
    pub remove_stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            ngram_range: (1, 2),
            lowercase: true,
            remove_stop_words: true,
        }
    }
}

impl VectorizerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if self.max_features == 0 {
            return Err(DeptClassError::config("vectorizer.max_features must be > 0"));
        }
        if min_n == 0 || min_n > max_n {
            return Err(DeptClassError::config(format!(
                "invalid vectorizer.ngram_range ({min_n}, {max_n})"
            )));
        }
        Ok(())
    }

    fn analyzer(&self) -> TextAnalyzer {
        TextAnalyzer::new(self.lowercase, self.remove_stop_words, self.ngram_range)
    }
}

/// Dense feature matrix, one row per text.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
    n_features: usize,
    /// Fingerprint of the vocabulary the rows were produced with, 0 if unknown.
    vocabulary_fingerprint: u32,
}

impl FeatureMatrix {
    /// Build a matrix from rows that all have `n_features` columns.
    pub fn new(rows: Vec<Vec<f64>>, n_features: usize) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|row| row.len() != n_features) {
            return Err(DeptClassError::invalid_features(format!(
                "row {bad} has {} columns, expected {n_features}",
                rows[bad].len()
            )));
        }
        Ok(Self {
            rows,
            n_features,
            vocabulary_fingerprint: 0,
        })
    }

    fn with_fingerprint(mut self, fingerprint: u32) -> Self {
        self.vocabulary_fingerprint = fingerprint;
        self
    }

    /// Number of rows.
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// One row.
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// See [`TfIdfVectorizer::fingerprint`].
    pub fn vocabulary_fingerprint(&self) -> u32 {
        self.vocabulary_fingerprint
    }
}

/// CRC32 over the terms in column order and their idf weights.
fn fingerprint_of(vocabulary: &HashMap<String, usize>, idf: &[f64]) -> u32 {
    let mut terms: Vec<(&usize, &String)> = vocabulary.iter().map(|(t, i)| (i, t)).collect();
    terms.sort_unstable();

    let mut hasher = crc32fast::Hasher::new();
    for (_, term) in terms {
        hasher.update(term.as_bytes());
        hasher.update(&[0]);
    }
    for weight in idf {
        hasher.update(&weight.to_bits().to_le_bytes());
    }
    hasher.finalize()
}

/// Fitted state, the part that is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedState {
    config: VectorizerConfig,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

/// TF-IDF vectorizer for text feature extraction.
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
    analyzer: TextAnalyzer,
    /// Vocabulary: term -> column index.
    vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column.
    idf: Vec<f64>,
    /// Number of documents seen during fitting.
    n_documents: usize,
    fingerprint: u32,
    fitted: bool,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.n_documents)
            .field("fitted", &self.fitted)
            .finish()
    }
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(config: VectorizerConfig) -> Self {
        let analyzer = config.analyzer();
        Self {
            config,
            analyzer,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            n_documents: 0,
            fingerprint: 0,
            fitted: false,
        }
    }

    /// Whether `fit` (or `restore`) has succeeded.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Size of the fitted vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Identifies the fitted feature space.
    ///
    /// Two fits agree on it only when they produced the same terms in the
    /// same columns with the same idf weights. 0 before fitting.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Column index of a term, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Fit the vocabulary and idf weights on `texts`.
    ///
    /// On failure the previous fit is left untouched.
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<()> {
        if texts.is_empty() {
            return Err(DeptClassError::vectorization(
                "cannot fit vectorizer on an empty corpus",
            ));
        }

        let analyzed: Vec<Vec<String>> = texts
            .iter()
            .map(|text| self.analyzer.analyze(text.as_ref()))
            .collect();

        // Corpus term frequency and document frequency.
        let mut term_frequency: HashMap<&str, usize> = HashMap::new();
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &analyzed {
            let mut seen = HashSet::new();
            for term in terms {
                *term_frequency.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        if term_frequency.is_empty() {
            return Err(DeptClassError::vectorization(
                "empty vocabulary; the documents may only contain stop words",
            ));
        }

        // Keep the most frequent terms, then index them in term order.
        let mut ranked: Vec<(&str, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.config.max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let n_documents = texts.len();
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (idx, term) in terms.into_iter().enumerate() {
            let df = document_frequency.get(term).copied().unwrap_or(0);
            // IDF = ln((N + 1) / (df + 1)) + 1
            idf.push(((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
            vocabulary.insert(term.to_string(), idx);
        }

        log::debug!(
            "fitted vectorizer on {n_documents} documents, vocabulary size {}",
            vocabulary.len()
        );

        self.fingerprint = fingerprint_of(&vocabulary, &idf);
        self.vocabulary = vocabulary;
        self.idf = idf;
        self.n_documents = n_documents;
        self.fitted = true;
        Ok(())
    }

    /// Fit on `texts` and return their feature matrix.
    pub fn fit_transform<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<FeatureMatrix> {
        self.fit(texts)?;
        self.transform(texts)
    }

    /// Map texts into the fitted feature space.
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<FeatureMatrix> {
        if !self.fitted {
            return Err(DeptClassError::not_fitted(
                "Vectorizer is not fitted. Call fit_transform first.",
            ));
        }
        let rows = texts
            .iter()
            .map(|text| self.transform_one(text.as_ref()))
            .collect();
        Ok(FeatureMatrix::new(rows, self.vocabulary.len())?.with_fingerprint(self.fingerprint))
    }

    /// Transform a single text into an L2-normalized tf-idf row.
    pub fn transform_one(&self, text: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.vocabulary.len()];
        for term in self.analyzer.analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                row[idx] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }

    /// Write the fitted state to `store` under `name`.
    ///
    /// Returns `Ok(false)` without writing when the vectorizer is not fitted.
    pub fn persist(&self, store: &dyn ModelStore, name: &str) -> Result<bool> {
        if !self.fitted {
            return Ok(false);
        }
        let state = FittedState {
            config: self.config.clone(),
            vocabulary: self.vocabulary.clone(),
            idf: self.idf.clone(),
            n_documents: self.n_documents,
        };
        let bytes = encode_component(VECTORIZER_COMPONENT, &state)?;
        store.write(name, &bytes)?;
        Ok(true)
    }

    /// Replace the state with the one stored under `name`.
    ///
    /// Returns `Ok(false)` when the resource does not exist.
    pub fn restore(&mut self, store: &dyn ModelStore, name: &str) -> Result<bool> {
        if !store.exists(name) {
            return Ok(false);
        }
        let bytes = store.read(name)?;
        let state: FittedState = decode_component(VECTORIZER_COMPONENT, &bytes)?;
        if state.idf.len() != state.vocabulary.len()
            || state.vocabulary.values().any(|&idx| idx >= state.idf.len())
        {
            return Err(DeptClassError::persistence(
                "vectorizer state is inconsistent: vocabulary and idf disagree",
            ));
        }

        self.fingerprint = fingerprint_of(&state.vocabulary, &state.idf);
        self.analyzer = state.config.analyzer();
        self.config = state.config;
        self.vocabulary = state.vocabulary;
        self.idf = state.idf;
        self.n_documents = state.n_documents;
        self.fitted = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryModelStore;

    fn corpus() -> Vec<&'static str> {
        vec![
            "How do I reset my password?",
            "How do I submit an expense report?",
            "What is the sales target for this quarter?",
            "How do I reset the printer?",
        ]
    }

    #[test]
    fn test_tfidf_vectorizer() {
        let mut vectorizer = TfIdfVectorizer::default();
        let matrix = vectorizer.fit_transform(&corpus()).unwrap();
        assert!(vectorizer.is_fitted());
        assert_eq!(matrix.n_samples(), 4);
        assert_eq!(matrix.n_features(), vectorizer.vocabulary_size());

        // "reset password" is a bigram over the filtered tokens.
        assert!(vectorizer.term_index("reset password").is_some());
        assert!(vectorizer.term_index("how").is_none());

        for row in matrix.rows() {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let mut vectorizer = TfIdfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();
        let row = vectorizer.transform_one("reset password");
        let reset = row[vectorizer.term_index("reset").unwrap()];
        let password = row[vectorizer.term_index("password").unwrap()];
        // "reset" occurs in two documents, "password" in one.
        assert!(password > reset);
    }

    #[test]
    fn test_vocabulary_is_sorted_and_capped() {
        let config = VectorizerConfig {
            max_features: 3,
            ..VectorizerConfig::default()
        };
        let mut vectorizer = TfIdfVectorizer::new(config);
        vectorizer.fit(&corpus()).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 3);
        // "reset" is the only term occurring twice, so it always survives.
        assert!(vectorizer.term_index("reset").is_some());
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let vectorizer = TfIdfVectorizer::default();
        let result = vectorizer.transform(&["anything"]);
        assert!(matches!(result, Err(DeptClassError::NotFitted(_))));
    }

    #[test]
    fn test_fit_errors_leave_state_untouched() {
        let mut vectorizer = TfIdfVectorizer::default();
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            vectorizer.fit(&empty),
            Err(DeptClassError::Vectorization(_))
        ));
        assert!(matches!(
            vectorizer.fit(&["how do I", "what is this"]),
            Err(DeptClassError::Vectorization(_))
        ));
        assert!(!vectorizer.is_fitted());
    }

    #[test]
    fn test_out_of_vocabulary_text_is_zero_row() {
        let mut vectorizer = TfIdfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();
        let row = vectorizer.transform_one("zebra giraffe");
        assert!(row.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_persist_and_restore() {
        let store = MemoryModelStore::new();
        let unfitted = TfIdfVectorizer::default();
        assert!(!unfitted.persist(&store, "vectorizer.bin").unwrap());
        assert!(store.is_empty());

        let mut vectorizer = TfIdfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();
        assert!(vectorizer.persist(&store, "vectorizer.bin").unwrap());

        let mut restored = TfIdfVectorizer::default();
        assert!(!restored.restore(&store, "missing.bin").unwrap());
        assert!(!restored.is_fitted());
        assert!(restored.restore(&store, "vectorizer.bin").unwrap());
        assert!(restored.is_fitted());
        assert_eq!(
            restored.transform_one("reset my password"),
            vectorizer.transform_one("reset my password")
        );
        assert_eq!(restored.fingerprint(), vectorizer.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_the_fit() {
        let config = VectorizerConfig {
            max_features: 3,
            ..VectorizerConfig::default()
        };
        let mut first = TfIdfVectorizer::new(config.clone());
        assert_eq!(first.fingerprint(), 0);
        let matrix = first.fit_transform(&corpus()).unwrap();
        assert_ne!(first.fingerprint(), 0);
        assert_eq!(matrix.vocabulary_fingerprint(), first.fingerprint());

        let mut same = TfIdfVectorizer::new(config.clone());
        same.fit(&corpus()).unwrap();
        assert_eq!(same.fingerprint(), first.fingerprint());

        // Same width, different terms.
        let mut other = TfIdfVectorizer::new(config);
        other
            .fit(&["Where are the payroll forms?", "Who approves vacation requests?"])
            .unwrap();
        assert_eq!(other.vocabulary_size(), first.vocabulary_size());
        assert_ne!(other.fingerprint(), first.fingerprint());

        let unknown = FeatureMatrix::new(vec![vec![0.0; 3]], 3).unwrap();
        assert_eq!(unknown.vocabulary_fingerprint(), 0);
    }
}
