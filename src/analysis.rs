//! Text analysis for question vectorization.
//!
//! Questions go through a fixed pipeline before they reach the vectorizer:
//! lowercasing, word tokenization (runs of two or more word characters),
//! English stop-word removal and n-gram expansion.

pub mod stop_words;
pub mod text_analyzer;

pub use stop_words::{ENGLISH_STOP_WORDS, is_stop_word};
pub use text_analyzer::TextAnalyzer;
