use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::knowledge::chunker::TextChunker;
use crate::knowledge::ingest::ingest_with;
use crate::knowledge::types::{Document, DocumentInfo, IngestResult, LibraryStats};

#[derive(Debug, Clone)]
struct Entry {
    content_hash: String,
    ingested_at: DateTime<Utc>,
}

/// Session-scoped collection of ingested documents.
///
/// Documents keep insertion order. Adding a document under an id that is
/// already present replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct DocumentLibrary {
    chunker: TextChunker,
    documents: Vec<Document>,
    entries: HashMap<String, Entry>,
}

impl DocumentLibrary {
    pub fn new(chunker: TextChunker) -> Self {
        Self {
            chunker,
            documents: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Ingest `content` and store it under `id`
    pub fn add(&mut self, id: &str, name: &str, content: &str) -> Result<IngestResult> {
        let document = ingest_with(id, name, content, &self.chunker)?;
        Ok(self.insert(document))
    }

    /// Store an already ingested document
    pub fn insert(&mut self, document: Document) -> IngestResult {
        let content_hash = compute_hash(&document.content);
        let previous = self.entries.insert(
            document.id.clone(),
            Entry {
                content_hash: content_hash.clone(),
                ingested_at: Utc::now(),
            },
        );

        let replaced = previous.is_some();
        let content_changed = previous.is_none_or(|entry| entry.content_hash != content_hash);
        let result = IngestResult {
            document_id: document.id.clone(),
            chunks_created: document.chunks.len(),
            replaced,
            content_changed,
        };

        match self.position(&document.id) {
            Some(idx) => self.documents[idx] = document,
            None => self.documents.push(document),
        }

        info!(
            document_id = %result.document_id,
            chunks = result.chunks_created,
            replaced,
            content_changed,
            "Stored document"
        );
        result
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let idx = self.position(id)?;
        self.entries.remove(id);
        let document = self.documents.remove(idx);
        info!(document_id = id, "Removed document");
        Some(document)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// All documents in insertion order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Summaries of every document, in insertion order
    pub fn list(&self) -> Vec<DocumentInfo> {
        self.documents
            .iter()
            .filter_map(|doc| {
                let entry = self.entries.get(&doc.id)?;
                Some(DocumentInfo {
                    id: doc.id.clone(),
                    name: doc.name.clone(),
                    chunks: doc.chunks.len(),
                    content_hash: entry.content_hash.clone(),
                    ingested_at: entry.ingested_at,
                })
            })
            .collect()
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats {
            total_documents: self.documents.len(),
            total_chunks: self.documents.iter().map(|d| d.chunks.len()).sum(),
            oldest_ingested: self.entries.values().map(|e| e.ingested_at).min(),
            newest_ingested: self.entries.values().map(|e| e.ingested_at).max(),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }
}

/// Hex-encoded SHA-256 of `content`
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
