//! TF-IDF relevance between a query and a chunk.
//!
//! Matching is substring based: a query term counts for every word (and every
//! chunk) that contains it, so `cat` also matches `category` and `mammal`
//! matches `mammals.`. This tolerates punctuation and simple inflection at the
//! cost of some false positives, and switching to exact token matching would
//! change rankings materially.

use crate::constants::MIN_TERM_LENGTH;
use crate::knowledge::types::TextChunk;

/// Query terms plus their IDF over a fixed chunk population.
/// Build once per query and score every chunk against it.
#[derive(Debug, Clone)]
pub struct TermScorer {
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl TermScorer {
    pub fn new<'c, I>(query: &str, corpus: I) -> Self
    where
        I: IntoIterator<Item = &'c TextChunk>,
    {
        let terms = tokenize_query(query);
        if terms.is_empty() {
            return Self {
                terms,
                idf: Vec::new(),
            };
        }

        let lowered: Vec<String> = corpus
            .into_iter()
            .map(|chunk| chunk.content.to_lowercase())
            .collect();

        let idf = terms
            .iter()
            .map(|term| {
                let df = lowered.iter().filter(|c| c.contains(term.as_str())).count();
                inverse_document_frequency(lowered.len(), df)
            })
            .collect();

        Self { terms, idf }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Mean of per-term `tf * idf`; 0 when the query has no usable terms
    pub fn score(&self, chunk: &TextChunk) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }

        let content = chunk.content.to_lowercase();
        let words: Vec<&str> = content.split_whitespace().collect();

        let total: f64 = self
            .terms
            .iter()
            .zip(&self.idf)
            .map(|(term, idf)| term_frequency(term, &words) * idf)
            .sum();

        total / self.terms.len() as f64
    }
}

/// Score `chunk` for `query`, using `all_chunks` as the IDF corpus
pub fn score<'c, I>(query: &str, chunk: &TextChunk, all_chunks: I) -> f64
where
    I: IntoIterator<Item = &'c TextChunk>,
{
    TermScorer::new(query, all_chunks).score(chunk)
}

/// Lowercase, drop everything but word characters and whitespace,
/// split on whitespace and keep terms longer than two characters
pub fn tokenize_query(query: &str) -> Vec<String> {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|term| term.chars().count() > MIN_TERM_LENGTH)
        .map(|term| term.to_string())
        .collect()
}

/// Fraction of `words` that contain `term`
pub(crate) fn term_frequency(term: &str, words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let matches = words.iter().filter(|word| word.contains(term)).count();
    matches as f64 / words.len() as f64
}

/// Smoothed IDF: `ln((N + 1) / (df + 1)) + 1`
pub(crate) fn inverse_document_frequency(total_chunks: usize, document_frequency: usize) -> f64 {
    ((total_chunks as f64 + 1.0) / (document_frequency as f64 + 1.0)).ln() + 1.0
}
