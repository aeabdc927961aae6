//! Chunking, TF-IDF retrieval and grounded answering over documents.

pub mod answerer;
pub mod chunker;
pub mod context;
pub mod formatting;
pub mod ingest;
pub mod library;
pub mod retriever;
pub mod scorer;
pub mod types;


pub use answerer::{parse_numbered_list, GroundedAnswerer};
pub use chunker::{chunk_text, TextChunker};
pub use context::build_context;
pub use ingest::{extract_text_from_file, ingest, ingest_with};
pub use library::DocumentLibrary;
pub use retriever::{search, Retriever};
pub use scorer::{score, TermScorer};
pub use types::{
    Document, DocumentInfo, GroundedAnswer, IngestResult, LibraryStats, Relevance, SearchResult,
    StudyQuestions, TextChunk,
};
