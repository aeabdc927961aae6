use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::{DEFAULT_LANGUAGE, DEFAULT_QUESTION_COUNT};
use crate::generation::{generate_with_retry, GenerationProvider, GenerationRequest, RetryPolicy};
use crate::knowledge::context::{build_context, is_empty_context};
use crate::knowledge::retriever::Retriever;
use crate::knowledge::types::{
    Document, GroundedAnswer, Relevance, SearchResult, StudyQuestions, TextChunk,
};

pub const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been processed yet. Upload a document before asking questions.";

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a question about your documents.";

/// Retrieval query used when question generation has no topic
const GENERAL_TOPIC_QUERY: &str = "key concepts definitions important main ideas";

/// Leading chunks used as context when a question topic matches nothing
const FALLBACK_CONTEXT_CHUNKS: usize = 3;

/// Retrieve-then-generate over a set of documents
pub struct GroundedAnswerer {
    provider: Arc<dyn GenerationProvider>,
    retriever: Retriever,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl GroundedAnswerer {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            retriever: Retriever::default(),
            retry_policy: RetryPolicy::none(),
            timeout: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn from_config(provider: Arc<dyn GenerationProvider>, config: &Config) -> Self {
        Self {
            provider,
            retriever: Retriever::new(&config.retrieval),
            retry_policy: RetryPolicy::new(&config.generation),
            timeout: Some(Duration::from_secs(config.generation.timeout_secs)),
            max_tokens: Some(config.generation.max_tokens),
            temperature: Some(config.generation.temperature),
        }
    }

    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Per-attempt limit on the generation call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Answer `query` strictly from the documents' content.
    /// Never fails: provider errors are reported through [`GroundedAnswer::error`].
    pub async fn answer<'a>(
        &self,
        query: &str,
        documents: &'a [Document],
        language: &str,
    ) -> GroundedAnswer<'a> {
        let chunks = collect_chunks(documents);
        if chunks.is_empty() {
            return ungrounded(NO_DOCUMENTS_MESSAGE);
        }
        if query.trim().is_empty() {
            return ungrounded(EMPTY_QUERY_MESSAGE);
        }

        let results = self.retriever.search(query, &chunks);
        let grounded = self.is_grounded(&results);
        let context = build_context(&results);
        let prompt = compose_answer_prompt(query, &context, language);

        debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            sources = results.len(),
            grounded,
            "Prepared grounded prompt"
        );

        match self.generate(prompt).await {
            Ok(answer) => {
                let confidence = confidence(&results);
                info!(sources = results.len(), confidence, grounded, "Answered query");
                GroundedAnswer {
                    answer,
                    sources: results,
                    confidence,
                    grounded,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Answer generation failed");
                GroundedAnswer {
                    answer: String::new(),
                    sources: results,
                    confidence: 0.0,
                    grounded,
                    error: Some(format!("Failed to generate answer: {}", e)),
                }
            }
        }
    }

    /// Generate up to `count` study questions about `topic` (or the documents in general)
    pub async fn generate_questions<'a>(
        &self,
        topic: Option<&str>,
        documents: &'a [Document],
        count: usize,
        language: &str,
    ) -> StudyQuestions<'a> {
        let chunks = collect_chunks(documents);
        if chunks.is_empty() {
            return StudyQuestions {
                questions: Vec::new(),
                sources: Vec::new(),
                grounded: false,
                error: Some(NO_DOCUMENTS_MESSAGE.to_string()),
            };
        }

        let count = if count == 0 { DEFAULT_QUESTION_COUNT } else { count };
        let query = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(GENERAL_TOPIC_QUERY);

        let results = self.retriever.search(query, &chunks);
        let grounded = self.is_grounded(&results);
        let mut context = build_context(&results);
        if is_empty_context(&context) {
            context = fallback_context(&chunks);
        }
        let prompt = compose_questions_prompt(topic, &context, count, language);

        match self.generate(prompt).await {
            Ok(output) => {
                let mut questions = parse_numbered_list(&output);
                questions.truncate(count);
                info!(questions = questions.len(), grounded, "Generated study questions");
                StudyQuestions {
                    questions,
                    sources: results,
                    grounded,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Question generation failed");
                StudyQuestions {
                    questions: Vec::new(),
                    sources: results,
                    grounded,
                    error: Some(format!("Failed to generate questions: {}", e)),
                }
            }
        }
    }

    fn is_grounded(&self, results: &[SearchResult<'_>]) -> bool {
        results
            .first()
            .is_some_and(|top| top.score >= self.retriever.similarity_threshold())
    }

    async fn generate(&self, prompt: String) -> anyhow::Result<String> {
        let mut request = GenerationRequest::new(prompt);
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;
        generate_with_retry(
            self.provider.as_ref(),
            &request,
            &self.retry_policy,
            self.timeout,
        )
        .await
    }
}

fn collect_chunks(documents: &[Document]) -> Vec<&TextChunk> {
    documents.iter().flat_map(|d| d.chunks.iter()).collect()
}

fn ungrounded<'a>(message: &str) -> GroundedAnswer<'a> {
    GroundedAnswer {
        answer: message.to_string(),
        sources: Vec::new(),
        confidence: 0.0,
        grounded: false,
        error: None,
    }
}

/// Mean score as a percentage, capped at 100
fn confidence(results: &[SearchResult<'_>]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let avg = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
    (avg * 100.0).min(100.0)
}

/// Context from the leading chunks, for when nothing matched the topic
fn fallback_context(chunks: &[&TextChunk]) -> String {
    let leading: Vec<SearchResult<'_>> = chunks
        .iter()
        .take(FALLBACK_CONTEXT_CHUNKS)
        .map(|&chunk| SearchResult {
            chunk,
            score: 0.0,
            relevance: Relevance::Low,
        })
        .collect();
    build_context(&leading)
}

/// Display name for a language code, or the code itself when unknown
pub fn language_name(code: &str) -> &str {
    match code.to_lowercase().as_str() {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "ru" => "Russian",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "tr" => "Turkish",
        "pl" => "Polish",
        _ => code,
    }
}

fn language_directive(language: &str) -> Option<String> {
    let language = language.trim();
    if language.is_empty() || language.eq_ignore_ascii_case(DEFAULT_LANGUAGE) {
        return None;
    }
    Some(format!(
        "Respond entirely in {}.",
        language_name(language)
    ))
}

pub(crate) fn compose_answer_prompt(query: &str, context: &str, language: &str) -> String {
    let mut prompt = String::from(
        "You are a study assistant. Answer the question using ONLY the document excerpts provided below. \
         Do not use any outside knowledge.\n",
    );
    if let Some(directive) = language_directive(language) {
        prompt.push_str(&directive);
        prompt.push('\n');
    }
    prompt.push_str("\nDOCUMENT EXCERPTS:\n");
    prompt.push_str(context);
    prompt.push_str("\nQUESTION: ");
    prompt.push_str(query.trim());
    prompt.push_str(
        "\n\nRULES:\n\
         1. Answer only with information found in the excerpts above.\n\
         2. If the excerpts do not contain enough information, say so explicitly instead of guessing.\n\
         3. When you use information from an excerpt, cite its label (for example \"Source 1\").\n\
         4. Never invent facts, figures, names or quotations.\n\
         5. Express uncertainty when the excerpts are ambiguous or incomplete.\n\
         6. Be concise and clear.\n\
         \nANSWER:",
    );
    prompt
}

pub(crate) fn compose_questions_prompt(
    topic: Option<&str>,
    context: &str,
    count: usize,
    language: &str,
) -> String {
    let mut prompt = format!(
        "You are a study assistant. Write exactly {} study questions based ONLY on the document excerpts provided below.\n",
        count
    );
    if let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) {
        prompt.push_str(&format!("Focus the questions on: {}\n", topic));
    }
    if let Some(directive) = language_directive(language) {
        prompt.push_str(&directive);
        prompt.push('\n');
    }
    prompt.push_str("\nDOCUMENT EXCERPTS:\n");
    prompt.push_str(context);
    prompt.push_str(
        "\nRULES:\n\
         1. Every question must be answerable from the excerpts above.\n\
         2. Mix recall questions with questions that test understanding.\n\
         3. Do not include answers.\n\
         4. Output a numbered list, one question per item, formatted as \"1. question\".\n\
         \nQUESTIONS:",
    );
    prompt
}

/// Split model output into items on leading `N. ` markers.
/// Lines before the first marker are dropped; continuation lines join the current item.
pub fn parse_numbered_list(output: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = strip_list_marker(line) {
            if let Some(done) = current.take() {
                items.push(done);
            }
            current = Some(rest.to_string());
        } else if let Some(item) = current.as_mut() {
            if !item.is_empty() {
                item.push(' ');
            }
            item.push_str(line);
        }
    }
    if let Some(done) = current {
        items.push(done);
    }

    items.retain(|item| !item.is_empty());
    items
}

/// `"12. text"` → `Some("text")`
fn strip_list_marker(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}
