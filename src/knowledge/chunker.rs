use crate::config::ChunkingConfig;
use crate::constants::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, MIN_CHUNK_LENGTH};
use crate::knowledge::types::TextChunk;

/// Splits normalized text into overlapping, sentence-aware chunks
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::with_sizes(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self::with_sizes(config.chunk_size, config.chunk_overlap)
    }

    /// A zero chunk size is treated as 1 and the overlap is clamped below the chunk size
    pub fn with_sizes(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk `text` for the document named `source`.
    /// Offsets in the returned chunks refer to the whitespace-normalized text.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let len = normalized.len();
        if len <= self.chunk_size {
            return vec![TextChunk {
                id: format!("{}-0", source),
                content: normalized,
                source: source.to_string(),
                start_index: 0,
                end_index: len,
            }];
        }

        let stop_at = len.saturating_sub(MIN_CHUNK_LENGTH);
        let mut chunks = Vec::new();
        let mut ordinal = 0;
        let mut start = 0;

        while start < stop_at {
            let mut end = floor_char_boundary(&normalized, (start + self.chunk_size).min(len));
            if end <= start {
                end = ceil_char_boundary(&normalized, start + 1);
            }

            if end < len {
                if let Some(boundary) = self.find_sentence_end(&normalized, start, end) {
                    end = boundary;
                }
            }

            if let Some((chunk_start, chunk_end)) = trimmed_range(&normalized, start, end) {
                let content = &normalized[chunk_start..chunk_end];
                if content.chars().count() > MIN_CHUNK_LENGTH {
                    chunks.push(TextChunk {
                        id: format!("{}-{}", source, ordinal),
                        content: content.to_string(),
                        source: source.to_string(),
                        start_index: chunk_start,
                        end_index: chunk_end,
                    });
                    ordinal += 1;
                }
            }

            // The tail is covered; stepping back by the overlap would only repeat it
            if end >= len {
                break;
            }

            let next = floor_char_boundary(&normalized, end - self.chunk_overlap.min(end));
            start = if next > start {
                next
            } else {
                ceil_char_boundary(&normalized, start + 1)
            };
        }

        chunks
    }

    /// Position just after the last `.`, `?` or `!` in `[start, end)`,
    /// provided it lies past the middle of the chunk window
    fn find_sentence_end(&self, text: &str, start: usize, end: usize) -> Option<usize> {
        let pos = start + text[start..end].rfind(['.', '?', '!'])?;
        if pos > start + self.chunk_size / 2 {
            Some(pos + 1)
        } else {
            None
        }
    }
}

/// Chunk with explicit sizes; see [`TextChunker::chunk`]
pub fn chunk_text(text: &str, source: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    TextChunker::with_sizes(chunk_size, overlap).chunk(text, source)
}

/// Collapse whitespace runs to a single space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte range of `text[start..end]` without surrounding whitespace
fn trimmed_range(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed_end = start + slice.trim_end().len();
    let trimmed_start = start + leading;
    (trimmed_start < trimmed_end).then_some((trimmed_start, trimmed_end))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn prose(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                format!(
                    "Sentence number {} talks about photosynthesis and cellular respiration.",
                    i
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Hello \n\n\t world  again "),
            "Hello world again"
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_empty_text_produces_no_chunks() {
        assert!(chunk_text("", "doc", 1000, 200).is_empty());
        assert!(chunk_text("   \n\n  ", "doc", 1000, 200).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk_is_never_discarded() {
        let chunks = chunk_text("  Tiny   note. ", "notes", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "notes-0");
        assert_eq!(chunks[0].content, "Tiny note.");
        assert_eq!(chunks[0].source, "notes");
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[0].end_index, "Tiny note.".len());
    }

    #[test]
    fn test_long_text_splits_on_sentence_boundaries() {
        let text = prose(40);
        let chunks = chunk_text(&text, "bio", 300, 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.content.ends_with('.'),
                "chunk should end on a sentence: {:?}",
                chunk.content
            );
        }
    }

    #[test]
    fn test_offsets_match_normalized_text() {
        let raw = format!("{}\n\n\n{}", prose(10), prose(10));
        let normalized = normalize_whitespace(&raw);
        let chunks = chunk_text(&raw, "doc", 250, 60);
        for chunk in &chunks {
            assert!(chunk.start_index < chunk.end_index);
            assert!(chunk.end_index <= normalized.len());
            assert_eq!(&normalized[chunk.start_index..chunk.end_index], chunk.content);
        }
    }

    #[test]
    fn test_chunks_overlap_and_cover_text() {
        let text = prose(30);
        let overlap = 80;
        let chunks = chunk_text(&text, "doc", 400, overlap);
        assert!(chunks.len() > 2);
        assert_eq!(chunks[0].start_index, 0);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_index > pair[0].start_index);
            assert!(
                pair[1].start_index <= pair[0].end_index + overlap,
                "gap between {} and {}",
                pair[0].id,
                pair[1].id
            );
        }
        let normalized = normalize_whitespace(&text);
        assert!(chunks.last().unwrap().end_index + MIN_CHUNK_LENGTH >= normalized.len());
    }

    #[test]
    fn test_ids_unique_and_sequential() {
        let chunks = chunk_text(&prose(50), "lecture", 200, 40);
        let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("lecture-{}", i));
        }
    }

    #[test]
    fn test_multi_chunk_output_has_no_micro_chunks() {
        let chunks = chunk_text(&prose(25), "doc", 120, 30);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() > MIN_CHUNK_LENGTH);
        }
    }

    #[test]
    fn test_terminates_for_degenerate_overlaps() {
        let text = "word ".repeat(300);
        for chunk_size in [1usize, 2, 7, 51, 64, 100, 333] {
            for overlap in [0, chunk_size / 2, chunk_size.saturating_sub(1), chunk_size, chunk_size * 3] {
                let chunks = chunk_text(&text, "doc", chunk_size, overlap);
                assert!(chunks.len() <= text.len());
            }
        }
    }

    #[test]
    fn test_terminates_with_large_overlap_and_sentence_cuts() {
        let text = prose(20);
        let chunks = chunk_text(&text, "doc", 100, 99);
        assert!(!chunks.is_empty());
        for pair in chunks.windows(2) {
            assert!(pair[1].start_index >= pair[0].start_index);
        }
    }

    #[test]
    fn test_zero_chunk_size_is_guarded() {
        let chunker = TextChunker::with_sizes(0, 10);
        assert_eq!(chunker.chunk_size(), 1);
        assert_eq!(chunker.chunk_overlap(), 0);
        let chunks = chunker.chunk(&prose(3), "doc");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_multibyte_text_respects_char_boundaries() {
        let text = "Żółć gęś jaźń — naïve café façade. ".repeat(40);
        let chunks = chunk_text(&text, "unicode", 97, 31);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = prose(15);
        let a = chunk_text(&text, "doc", 200, 40);
        let b = chunk_text(&text, "doc", 200, 40);
        assert_eq!(a, b);
    }
}
