//! Tokenization and n-gram expansion.

use std::sync::LazyLock;

use regex::Regex;

use super::stop_words::is_stop_word;

/// Words are runs of at least two word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Turns raw text into the terms the vectorizer counts.
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    lowercase: bool,
    remove_stop_words: bool,
    ngram_range: (usize, usize),
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new(true, true, (1, 2))
    }
}

impl TextAnalyzer {
    /// Create an analyzer. `ngram_range` is inclusive on both ends.
    pub fn new(lowercase: bool, remove_stop_words: bool, ngram_range: (usize, usize)) -> Self {
        Self {
            lowercase,
            remove_stop_words,
            ngram_range,
        }
    }

    /// Split text into word tokens, dropping stop words when configured.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        TOKEN_PATTERN
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .filter(|token| !self.remove_stop_words || !is_stop_word(&token.to_lowercase()))
            .collect()
    }

    /// Produce every term of the text: n-grams for each `n` in the range,
    /// built over the stop-word-filtered token sequence.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let (min_n, max_n) = self.ngram_range;

        let mut terms = Vec::new();
        for n in min_n.max(1)..=max_n {
            if n > tokens.len() {
                break;
            }
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else {
                terms.extend(tokens.windows(n).map(|window| window.join(" ")));
            }
        }
        terms
    }
}
