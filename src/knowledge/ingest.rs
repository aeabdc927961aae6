use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::knowledge::chunker::TextChunker;
use crate::knowledge::types::Document;

/// Wrap width handed to the HTML renderer. Whitespace is collapsed afterwards.
const HTML_RENDER_WIDTH: usize = 120;

/// Build a [`Document`] from raw text with the default chunker.
///
/// The document keeps the original `content`; chunks use `name` as their source.
pub fn ingest(id: &str, name: &str, content: &str) -> Result<Document> {
    ingest_with(id, name, content, &TextChunker::default())
}

/// Same as [`ingest`] with an explicit chunker.
/// A blank `id` is rejected, a blank `name` falls back to the id.
pub fn ingest_with(id: &str, name: &str, content: &str, chunker: &TextChunker) -> Result<Document> {
    let id = id.trim();
    if id.is_empty() {
        anyhow::bail!("Document id must not be empty");
    }
    let name = match name.trim() {
        "" => id,
        trimmed => trimmed,
    };

    let chunks = chunker.chunk(content, name);
    debug!(
        document_id = id,
        chunks = chunks.len(),
        bytes = content.len(),
        "Chunked document"
    );

    Ok(Document {
        id: id.to_string(),
        name: name.to_string(),
        content: content.to_string(),
        chunks,
    })
}

/// Read plain text out of a file on disk, picking the extractor by extension.
///
/// Supports `.txt`/`.md` (and any other UTF-8 file), `.html`/`.htm` and `.pdf`.
pub fn extract_text_from_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    extract_text(&bytes, &extension).with_context(|| format!("Failed to extract {}", path.display()))
}

/// Extract text from raw bytes given a lowercase file extension
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<String> {
    match extension {
        "html" | "htm" => html2text::from_read(bytes, HTML_RENDER_WIDTH)
            .context("Failed to convert HTML to text"),
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e)),
        _ => String::from_utf8(bytes.to_vec()).map_err(|_| {
            if extension.is_empty() {
                anyhow::anyhow!("File is not valid UTF-8 text")
            } else {
                anyhow::anyhow!("Unsupported file type '.{}': not valid UTF-8 text", extension)
            }
        }),
    }
}

/// Document name for a file: its file name, or the full path if it has none
pub fn document_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ingest_chunks_with_name_as_source() {
        let doc = ingest("doc-1", "biology.txt", "Cells divide by mitosis.").unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.name, "biology.txt");
        assert_eq!(doc.content, "Cells divide by mitosis.");
        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.chunks[0].id, "biology.txt-0");
        assert_eq!(doc.chunks[0].source, "biology.txt");
    }

    #[test]
    fn test_ingest_keeps_original_content() {
        let raw = "Line one.\n\n\tLine   two.";
        let doc = ingest("d", "notes", raw).unwrap();
        assert_eq!(doc.content, raw);
        assert_eq!(doc.chunks[0].content, "Line one. Line two.");
    }

    #[test]
    fn test_empty_content_yields_no_chunks() {
        let doc = ingest("empty", "empty.txt", "  \n ").unwrap();
        assert!(doc.chunks.is_empty());
    }

    #[test]
    fn test_blank_id_rejected_and_blank_name_defaults() {
        assert!(ingest("  ", "name", "text").is_err());
        let doc = ingest("doc-9", "   ", "Some text here.").unwrap();
        assert_eq!(doc.name, "doc-9");
        assert_eq!(doc.chunks[0].source, "doc-9");
    }

    #[test]
    fn test_ingest_with_custom_chunker() {
        let text = "Plants convert light into chemical energy during photosynthesis. ".repeat(20);
        let chunker = TextChunker::with_sizes(200, 40);
        let doc = ingest_with("p", "plants", &text, &chunker).unwrap();
        assert!(doc.chunks.len() > 1);
        assert!(doc.chunks.iter().all(|c| c.content.len() <= 200));
    }

    #[test]
    fn test_extract_plain_text_and_markdown() {
        assert_eq!(extract_text(b"# Title\nbody", "md").unwrap(), "# Title\nbody");
        assert_eq!(extract_text(b"plain", "").unwrap(), "plain");
        assert!(extract_text(&[0xff, 0xfe, 0x00], "bin").is_err());
    }

    #[test]
    fn test_extract_html() {
        let html = b"<html><body><h1>Osmosis</h1><p>Water moves across membranes.</p></body></html>";
        let text = extract_text(html, "html").unwrap();
        assert!(text.contains("Osmosis"));
        assert!(text.contains("Water moves across membranes."));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_extract_text_from_file() {
        let dir = std::env::temp_dir().join(format!("octorag-ingest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lecture.TXT");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Enzymes speed up reactions.").unwrap();

        let text = extract_text_from_file(&path).unwrap();
        assert_eq!(text.trim(), "Enzymes speed up reactions.");
        assert_eq!(document_name_for(&path), "lecture.TXT");

        assert!(extract_text_from_file(&dir.join("missing.txt")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
