use crate::constants::NO_CONTEXT_SENTINEL;
use crate::knowledge::types::SearchResult;

/// Render ranked results as labeled, source-attributed blocks for a prompt.
/// Returns [`NO_CONTEXT_SENTINEL`] when there is nothing to render.
pub fn build_context(results: &[SearchResult<'_>]) -> String {
    if results.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    let mut output = String::new();
    for (rank, result) in results.iter().enumerate() {
        output.push_str(&format!("[Source {}: {}]\n", rank + 1, result.chunk.source));
        output.push_str(&result.chunk.content);
        output.push_str("\n\n");
    }
    output
}

/// True when `context` came from an empty result set
pub fn is_empty_context(context: &str) -> bool {
    context == NO_CONTEXT_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::{Relevance, TextChunk};

    fn chunk(source: &str, content: &str) -> TextChunk {
        TextChunk {
            id: format!("{}-0", source),
            content: content.to_string(),
            source: source.to_string(),
            start_index: 0,
            end_index: content.len(),
        }
    }

    #[test]
    fn test_empty_results_yield_sentinel() {
        let context = build_context(&[]);
        assert!(is_empty_context(&context));
    }

    #[test]
    fn test_blocks_are_labeled_in_rank_order() {
        let first = chunk("biology.pdf", "Cells are the basic unit of life.");
        let second = chunk("notes.txt", "Mitochondria are the powerhouse of the cell.");
        let results = vec![
            SearchResult {
                chunk: &first,
                score: 0.9,
                relevance: Relevance::High,
            },
            SearchResult {
                chunk: &second,
                score: 0.4,
                relevance: Relevance::Low,
            },
        ];

        let context = build_context(&results);
        assert!(!is_empty_context(&context));
        assert_eq!(
            context,
            "[Source 1: biology.pdf]\nCells are the basic unit of life.\n\n\
             [Source 2: notes.txt]\nMitochondria are the powerhouse of the cell.\n\n"
        );
    }

    #[test]
    fn test_chunk_content_is_not_truncated() {
        let long = "word ".repeat(500);
        let c = chunk("long.txt", long.trim());
        let results = vec![SearchResult {
            chunk: &c,
            score: 0.5,
            relevance: Relevance::Medium,
        }];
        assert!(build_context(&results).contains(long.trim()));
    }
}
