// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{DEFAULT_LANGUAGE, DEFAULT_QUESTION_COUNT};
use crate::generation::GenerationProvider;
use crate::knowledge::ingest::{document_name_for, extract_text_from_file};
use crate::knowledge::{Document, DocumentLibrary, GroundedAnswerer, Retriever, TextChunker};
use crate::mcp::types::{McpError, McpTool};

const MAX_QUESTION_COUNT: usize = 20;

/// Document tools provider backed by one in-memory library
#[derive(Clone)]
pub struct DocumentsProvider {
    library: Arc<RwLock<DocumentLibrary>>,
    retriever: Retriever,
    answerer: Option<Arc<GroundedAnswerer>>,
}

impl DocumentsProvider {
    /// `provider` is optional: without it only ingestion and search tools work
    pub fn new(config: &Config, provider: Option<Arc<dyn GenerationProvider>>) -> Self {
        let retriever = Retriever::new(&config.retrieval);
        let answerer = provider.map(|p| {
            Arc::new(GroundedAnswerer::from_config(p, config).with_retriever(retriever.clone()))
        });

        Self {
            library: Arc::new(RwLock::new(DocumentLibrary::new(TextChunker::new(
                &config.chunking,
            )))),
            retriever,
            answerer,
        }
    }

    /// Get all tool definitions for document operations
    pub fn get_tool_definitions() -> Vec<McpTool> {
        vec![
            McpTool {
                name: "ingest_document".to_string(),
                description: "Add a document to the session library so it can be searched and asked about. Provide either the raw text in `content` or a local file `path` (.txt, .md, .html, .pdf). Re-using an existing `id` replaces that document.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "Unique document id. Generated when omitted."
                        },
                        "name": {
                            "type": "string",
                            "description": "Human-readable name, shown as the source of every passage. Defaults to the file name or the id."
                        },
                        "content": {
                            "type": "string",
                            "description": "Raw document text"
                        },
                        "path": {
                            "type": "string",
                            "description": "Path of a local file to read instead of `content`"
                        }
                    },
                    "additionalProperties": false
                }),
            },
            McpTool {
                name: "list_documents".to_string(),
                description: "List the documents in the session library with their chunk counts.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false
                }),
            },
            McpTool {
                name: "remove_document".to_string(),
                description: "Remove a document from the session library.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Id of the document to remove" }
                    },
                    "required": ["id"],
                    "additionalProperties": false
                }),
            },
            McpTool {
                name: "search_documents".to_string(),
                description: "Find the passages of the ingested documents most relevant to a query, ranked by TF-IDF score. Passages below the relevance threshold are never returned.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to look for, in natural language",
                            "minLength": 1,
                            "maxLength": 500
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of passages to return",
                            "minimum": 1,
                            "maximum": 50
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }),
            },
            McpTool {
                name: "ask_documents".to_string(),
                description: "Answer a question strictly from the ingested documents. The answer cites its sources and reports a confidence and whether it is grounded in the documents.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question to answer",
                            "minLength": 1,
                            "maxLength": 1000
                        },
                        "language": {
                            "type": "string",
                            "description": "Answer language code, e.g. 'en', 'es', 'fr'",
                            "default": "en"
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }),
            },
            McpTool {
                name: "generate_questions".to_string(),
                description: "Write study questions answerable from the ingested documents, optionally focused on a topic.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string", "description": "Optional focus topic" },
                        "count": {
                            "type": "integer",
                            "description": "Number of questions",
                            "minimum": 1,
                            "maximum": MAX_QUESTION_COUNT,
                            "default": DEFAULT_QUESTION_COUNT
                        },
                        "language": {
                            "type": "string",
                            "description": "Question language code",
                            "default": "en"
                        }
                    },
                    "additionalProperties": false
                }),
            },
        ]
    }

    pub async fn execute_ingest_document(&self, arguments: &Value) -> Result<String, McpError> {
        let content_arg = optional_str(arguments, "content");
        let path_arg = optional_str(arguments, "path");

        let (content, default_name) = match (content_arg, path_arg) {
            (Some(content), None) => (content.to_string(), None),
            (None, Some(path)) => {
                let path = Path::new(path);
                let text = extract_text_from_file(path).map_err(|e| {
                    McpError::invalid_params(format!("{:#}", e), "ingest_document")
                })?;
                (text, Some(document_name_for(path)))
            }
            _ => {
                return Err(McpError::invalid_params(
                    "Provide exactly one of `content` or `path`",
                    "ingest_document",
                ))
            }
        };

        let id = optional_str(arguments, "id")
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = optional_str(arguments, "name")
            .map(str::to_string)
            .or(default_name)
            .unwrap_or_default();

        let result = self
            .library
            .write()
            .await
            .add(&id, &name, &content)
            .map_err(|e| McpError::invalid_params(e.to_string(), "ingest_document"))?;

        to_json(&result, "ingest_document")
    }

    pub async fn execute_list_documents(&self, _arguments: &Value) -> Result<String, McpError> {
        let library = self.library.read().await;
        to_json(
            &json!({
                "documents": library.list(),
                "stats": library.stats(),
            }),
            "list_documents",
        )
    }

    pub async fn execute_remove_document(&self, arguments: &Value) -> Result<String, McpError> {
        let id = required_str(arguments, "id", "remove_document")?;
        match self.library.write().await.remove(id) {
            Some(doc) => Ok(format!("Removed document '{}' ({})", doc.name, doc.id)),
            None => Err(McpError::invalid_params(
                format!("Document not found: {}", id),
                "remove_document",
            )),
        }
    }

    pub async fn execute_search_documents(&self, arguments: &Value) -> Result<String, McpError> {
        let query = required_str(arguments, "query", "search_documents")?;
        let mut retriever = self.retriever.clone();
        if let Some(limit) = arguments.get("limit").and_then(Value::as_u64) {
            retriever = retriever.with_max_results(limit.clamp(1, 50) as usize);
        }

        let library = self.library.read().await;
        let chunks: Vec<_> = library
            .documents()
            .iter()
            .flat_map(|d| d.chunks.iter())
            .collect();
        let results = retriever.search(query, &chunks);
        debug!(query, results = results.len(), "MCP search");

        if results.is_empty() {
            return Ok("No relevant passages found".to_string());
        }
        to_json(&results, "search_documents")
    }

    pub async fn execute_ask_documents(&self, arguments: &Value) -> Result<String, McpError> {
        let query = required_str(arguments, "query", "ask_documents")?;
        let language = optional_str(arguments, "language").unwrap_or(DEFAULT_LANGUAGE);
        let answerer = self.answerer("ask_documents")?;

        let documents = self.snapshot().await;
        let answer = answerer.answer(query, &documents, language).await;
        if let Some(error) = &answer.error {
            warn!(error = %error, "ask_documents failed to generate");
        }
        to_json(&answer, "ask_documents")
    }

    pub async fn execute_generate_questions(&self, arguments: &Value) -> Result<String, McpError> {
        let topic = optional_str(arguments, "topic");
        let count = arguments
            .get("count")
            .and_then(Value::as_u64)
            .map(|c| (c as usize).clamp(1, MAX_QUESTION_COUNT))
            .unwrap_or(DEFAULT_QUESTION_COUNT);
        let language = optional_str(arguments, "language").unwrap_or(DEFAULT_LANGUAGE);
        let answerer = self.answerer("generate_questions")?;

        let documents = self.snapshot().await;
        let questions = answerer
            .generate_questions(topic, &documents, count, language)
            .await;
        to_json(&questions, "generate_questions")
    }

    /// Copy of the documents so no lock is held across a generation call
    async fn snapshot(&self) -> Vec<Document> {
        self.library.read().await.documents().to_vec()
    }

    fn answerer(&self, operation: &str) -> Result<&GroundedAnswerer, McpError> {
        self.answerer.as_deref().ok_or_else(|| {
            McpError::internal_error(
                "No generation provider configured. Check [generation] in config.toml and the API key environment variable.",
                operation,
            )
        })
    }
}

fn optional_str<'v>(arguments: &'v Value, key: &str) -> Option<&'v str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn required_str<'v>(arguments: &'v Value, key: &str, operation: &str) -> Result<&'v str, McpError> {
    optional_str(arguments, key).ok_or_else(|| {
        McpError::invalid_params(format!("Missing required parameter: {}", key), operation)
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, operation: &str) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), operation))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    use crate::generation::GenerationRequest;

    struct EchoProvider;

    #[async_trait]
    impl GenerationProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Ok("1. What do enzymes do?\n2. What lowers activation energy?".to_string())
        }
    }

    /// Answers only after a delay, like a slow remote model
    struct SlowProvider;

    #[async_trait]
    impl GenerationProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(400)).await;
            Ok("Enzymes lower activation energy [Source 1].".to_string())
        }
    }

    const ENZYMES: &str =
        "Enzymes: enzymes catalyse reactions and enzymes lower activation energy.";

    fn provider(with_generation: bool) -> DocumentsProvider {
        let generation: Option<Arc<dyn GenerationProvider>> = if with_generation {
            Some(Arc::new(EchoProvider))
        } else {
            None
        };
        DocumentsProvider::new(&Config::default(), generation)
    }

    #[tokio::test]
    async fn test_ingest_search_remove() {
        let tools = provider(false);
        let ingested = tools
            .execute_ingest_document(&json!({ "id": "bio", "name": "enzymes.txt", "content": ENZYMES }))
            .await
            .unwrap();
        let ingested: Value = serde_json::from_str(&ingested).unwrap();
        assert_eq!(ingested["document_id"], "bio");
        assert_eq!(ingested["chunks_created"], 1);

        let found = tools
            .execute_search_documents(&json!({ "query": "enzymes" }))
            .await
            .unwrap();
        let found: Value = serde_json::from_str(&found).unwrap();
        assert_eq!(found[0]["chunk"]["source"], "enzymes.txt");

        let listed = tools.execute_list_documents(&json!({})).await.unwrap();
        assert!(listed.contains("enzymes.txt"));

        tools
            .execute_remove_document(&json!({ "id": "bio" }))
            .await
            .unwrap();
        assert!(tools
            .execute_remove_document(&json!({ "id": "bio" }))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_ingest_requires_one_source() {
        let tools = provider(false);
        assert!(tools.execute_ingest_document(&json!({})).await.is_err());
        assert!(tools
            .execute_ingest_document(&json!({ "content": "x", "path": "/tmp/x.txt" }))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid_params() {
        let tools = provider(false);
        let err = tools
            .execute_search_documents(&json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::mcp::types::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_ask_without_generation_provider() {
        let tools = provider(false);
        let err = tools
            .execute_ask_documents(&json!({ "query": "enzymes" }))
            .await
            .unwrap_err();
        assert!(err.message.contains("No generation provider"));
    }

    #[tokio::test]
    async fn test_ask_and_questions() {
        let tools = provider(true);
        tools
            .execute_ingest_document(&json!({ "id": "bio", "name": "enzymes.txt", "content": ENZYMES }))
            .await
            .unwrap();

        let answer = tools
            .execute_ask_documents(&json!({ "query": "enzymes" }))
            .await
            .unwrap();
        let answer: Value = serde_json::from_str(&answer).unwrap();
        assert_eq!(answer["grounded"], true);
        assert_eq!(answer["sources"][0]["relevance"], "low");
        assert_eq!(answer["sources"][0]["chunk"]["source"], "enzymes.txt");

        let questions = tools
            .execute_generate_questions(&json!({ "count": 1 }))
            .await
            .unwrap();
        let questions: Value = serde_json::from_str(&questions).unwrap();
        assert_eq!(questions["questions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_not_blocked_while_answer_generates() {
        let tools = DocumentsProvider::new(&Config::default(), Some(Arc::new(SlowProvider)));
        tools
            .execute_ingest_document(&json!({ "id": "bio", "name": "enzymes.txt", "content": ENZYMES }))
            .await
            .unwrap();

        let asking = tools.clone();
        let pending = tokio::spawn(async move {
            asking
                .execute_ask_documents(&json!({ "query": "enzymes" }))
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ingest_args =
            json!({ "id": "cells", "name": "cells.txt", "content": "Cells divide by mitosis." });
        let ingest = tools.execute_ingest_document(&ingest_args);
        let ingested = tokio::time::timeout(Duration::from_millis(150), ingest).await;
        assert!(ingested.is_ok(), "ingest waited on the generation call");
        assert!(ingested.unwrap().is_ok());

        let answer: Value = serde_json::from_str(&pending.await.unwrap().unwrap()).unwrap();
        assert_eq!(answer["answer"], "Enzymes lower activation energy [Source 1].");
        assert_eq!(tools.library.read().await.len(), 2);
    }
}
