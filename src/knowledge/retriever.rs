use tracing::debug;

use crate::config::RetrievalConfig;
use crate::constants::{DEFAULT_MAX_RESULTS, SIMILARITY_THRESHOLD};
use crate::knowledge::scorer::TermScorer;
use crate::knowledge::types::{Relevance, SearchResult, TextChunk};

/// Ranks chunks for a query with a relevance threshold and top-K cut
#[derive(Debug, Clone)]
pub struct Retriever {
    similarity_threshold: f64,
    max_results: usize,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            similarity_threshold: SIMILARITY_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl Retriever {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            max_results: config.max_results,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_threshold(mut self, similarity_threshold: f64) -> Self {
        self.similarity_threshold = similarity_threshold;
        self
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Score every chunk against the others, keep those at or above the
    /// threshold, highest first. Ties keep their input order.
    pub fn search<'a>(&self, query: &str, chunks: &[&'a TextChunk]) -> Vec<SearchResult<'a>> {
        let scorer = TermScorer::new(query, chunks.iter().copied());

        let mut results: Vec<SearchResult<'a>> = chunks
            .iter()
            .copied()
            .filter_map(|chunk| {
                let score = scorer.score(chunk);
                (score >= self.similarity_threshold).then(|| SearchResult {
                    chunk,
                    score,
                    relevance: Relevance::from_score(score),
                })
            })
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            terms = scorer.terms().len(),
            candidates = chunks.len(),
            kept = results.len(),
            "Ranked chunks for query"
        );

        results.truncate(self.max_results);
        results
    }
}

/// Search a single chunk population with the default threshold
pub fn search<'a>(query: &str, chunks: &'a [TextChunk], max_results: usize) -> Vec<SearchResult<'a>> {
    let refs: Vec<&'a TextChunk> = chunks.iter().collect();
    Retriever::default()
        .with_max_results(max_results)
        .search(query, &refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str) -> TextChunk {
        TextChunk {
            id: id.to_string(),
            content: content.to_string(),
            source: "notes".to_string(),
            start_index: 0,
            end_index: content.len(),
        }
    }

    fn corpus() -> Vec<TextChunk> {
        vec![
            chunk("notes-0", "enzymes enzymes catalyse reactions"),
            chunk("notes-1", "enzymes lower activation energy"),
            chunk("notes-2", "volcanoes erupt molten rock"),
            chunk("notes-3", "enzymes enzymes enzymes"),
        ]
    }

    #[test]
    fn test_below_threshold_chunks_are_excluded() {
        let chunks = corpus();
        let results = search("enzymes", &chunks, 10);
        assert!(!results.is_empty());
        for r in &results {
            assert!(r.score >= SIMILARITY_THRESHOLD);
            assert_ne!(r.chunk.id, "notes-2");
        }
    }

    #[test]
    fn test_results_sorted_descending() {
        let chunks = corpus();
        let results = search("enzymes", &chunks, 10);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].chunk.id, "notes-3");
    }

    #[test]
    fn test_truncates_to_max_results() {
        let chunks = corpus();
        let results = search("enzymes", &chunks, 1);
        assert_eq!(results.len(), 1);
        assert!(search("enzymes", &chunks, 0).is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let chunks = vec![
            chunk("a-0", "glucose glucose"),
            chunk("a-1", "starch starch"),
            chunk("a-2", "glucose glucose"),
        ];
        let results = search("glucose", &chunks, 5);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a-0", "a-2"]);
    }

    #[test]
    fn test_relevance_tiers() {
        assert_eq!(Relevance::from_score(0.95), Relevance::High);
        assert_eq!(Relevance::from_score(0.7), Relevance::High);
        assert_eq!(Relevance::from_score(0.69), Relevance::Medium);
        assert_eq!(Relevance::from_score(0.5), Relevance::Medium);
        assert_eq!(Relevance::from_score(0.49), Relevance::Low);
        assert_eq!(Relevance::from_score(0.3), Relevance::Low);
    }

    #[test]
    fn test_tier_assigned_from_score() {
        let chunks = corpus();
        for r in search("enzymes", &chunks, 10) {
            assert_eq!(r.relevance, Relevance::from_score(r.score));
        }
    }

    #[test]
    fn test_absent_term_returns_empty() {
        let chunks = corpus();
        assert!(search("spacecraft", &chunks, 5).is_empty());
    }

    #[test]
    fn test_empty_query_and_corpus() {
        let chunks = corpus();
        assert!(search("", &chunks, 5).is_empty());
        assert!(search("enzymes", &[], 5).is_empty());
    }

    #[test]
    fn test_results_borrow_original_chunks() {
        let chunks = corpus();
        let results = search("enzymes", &chunks, 5);
        assert!(results
            .iter()
            .all(|r| chunks.iter().any(|c| std::ptr::eq(c, r.chunk))));
    }

    #[test]
    fn test_custom_threshold() {
        let chunks = corpus();
        let strict = Retriever::default().with_threshold(0.99);
        let refs: Vec<&TextChunk> = chunks.iter().collect();
        let results = strict.search("enzymes", &refs);
        for r in &results {
            assert!(r.score >= 0.99);
        }
    }
}
