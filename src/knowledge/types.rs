use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_RELEVANCE_THRESHOLD, MEDIUM_RELEVANCE_THRESHOLD};

/// A contiguous slice of one document's normalized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// `{source}-{ordinal}`, unique within a document
    pub id: String,
    pub content: String,
    /// Name of the owning document
    pub source: String,
    /// Byte offsets into the normalized document text
    pub start_index: usize,
    pub end_index: usize,
}

/// The unit of ingestion. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Full original text
    pub content: String,
    /// In text order
    pub chunks: Vec<TextChunk>,
}

/// Discretized relevance of a retrieved chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    Low,
    Medium,
    High,
}

impl Relevance {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RELEVANCE_THRESHOLD {
            Relevance::High
        } else if score >= MEDIUM_RELEVANCE_THRESHOLD {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }
}

impl std::fmt::Display for Relevance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relevance::High => write!(f, "high"),
            Relevance::Medium => write!(f, "medium"),
            Relevance::Low => write!(f, "low"),
        }
    }
}

/// A ranked chunk for one query. Borrows the chunk from its document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchResult<'a> {
    pub chunk: &'a TextChunk,
    pub score: f64,
    pub relevance: Relevance,
}

/// Final output of a grounded query
#[derive(Debug, Clone, Serialize)]
pub struct GroundedAnswer<'a> {
    pub answer: String,
    /// Highest score first
    pub sources: Vec<SearchResult<'a>>,
    /// In [0, 100]
    pub confidence: f64,
    pub grounded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GroundedAnswer<'_> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Study questions produced from the uploaded documents
#[derive(Debug, Clone, Serialize)]
pub struct StudyQuestions<'a> {
    pub questions: Vec<String>,
    pub sources: Vec<SearchResult<'a>>,
    pub grounded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about a document library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub oldest_ingested: Option<DateTime<Utc>>,
    pub newest_ingested: Option<DateTime<Utc>>,
}

/// Library listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    pub chunks: usize,
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

/// Result of adding a document to a library
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub document_id: String,
    pub chunks_created: usize,
    /// An existing document with the same id was replaced
    pub replaced: bool,
    pub content_changed: bool,
}
