use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::knowledge::types::{
    Document, DocumentInfo, GroundedAnswer, LibraryStats, Relevance, SearchResult, StudyQuestions,
};

const PREVIEW_CHARS: usize = 200;

pub fn format_search_results(results: &[SearchResult<'_>]) -> String {
    if results.is_empty() {
        return "No relevant passages found".to_string();
    }

    let mut output = String::new();

    for (rank, result) in results.iter().enumerate() {
        output.push_str(&"━".repeat(60));
        output.push('\n');

        output.push_str(
            &format!("Source {}: {}", rank + 1, result.chunk.source)
                .blue()
                .bold()
                .to_string(),
        );
        output.push('\n');
        output.push_str(
            &format!(
                "{} [{}..{}]",
                result.chunk.id, result.chunk.start_index, result.chunk.end_index
            )
            .bright_black()
            .to_string(),
        );
        output.push('\n');

        output.push_str(&preview(&result.chunk.content));
        output.push('\n');

        output.push_str(&format_relevance(result.score, result.relevance));
        output.push_str("\n\n");
    }

    output
}

pub fn format_answer(answer: &GroundedAnswer<'_>) -> String {
    let mut output = String::new();

    if let Some(error) = &answer.error {
        output.push_str(&format!("Error: {}", error).red().bold().to_string());
        output.push('\n');
    } else {
        output.push_str(&answer.answer);
        output.push_str("\n\n");
    }

    let grounding = if answer.grounded {
        "grounded in your documents".green()
    } else {
        "not grounded: no passage cleared the relevance threshold".yellow()
    };
    output.push_str(&format!(
        "Confidence: {:.0}% ({})\n",
        answer.confidence, grounding
    ));

    if !answer.sources.is_empty() {
        output.push('\n');
        output.push_str(&"Sources".bold().to_string());
        output.push('\n');
        for (rank, source) in answer.sources.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} ({})\n",
                rank + 1,
                source.chunk.source.cyan(),
                format_relevance(source.score, source.relevance)
            ));
        }
    }

    output
}

pub fn format_questions(questions: &StudyQuestions<'_>) -> String {
    if let Some(error) = &questions.error {
        return format!("Error: {}", error).red().bold().to_string();
    }
    if questions.questions.is_empty() {
        return "No questions generated".to_string();
    }

    let mut output = String::new();
    for (i, question) in questions.questions.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", (i + 1).to_string().bold(), question));
    }
    if !questions.grounded {
        output.push('\n');
        output.push_str(
            &"Topic not found in the documents; questions cover the opening passages."
                .yellow()
                .to_string(),
        );
        output.push('\n');
    }
    output
}

pub fn format_chunks(document: &Document) -> String {
    let mut output = String::new();
    output.push_str(
        &format!("{} ({} chunks)", document.name, document.chunks.len())
            .bold()
            .to_string(),
    );
    output.push('\n');

    for chunk in &document.chunks {
        output.push_str(&"─".repeat(60));
        output.push('\n');
        output.push_str(
            &format!(
                "{} [{}..{}] {} chars",
                chunk.id,
                chunk.start_index,
                chunk.end_index,
                chunk.content.chars().count()
            )
            .bright_black()
            .to_string(),
        );
        output.push('\n');
        output.push_str(&preview(&chunk.content));
        output.push('\n');
    }

    output
}

pub fn format_stats(stats: &LibraryStats) -> String {
    let mut output = String::new();

    output.push_str(&"Document Library Statistics".bold().to_string());
    output.push('\n');
    output.push_str(&format!("Total Documents: {}", stats.total_documents));
    output.push('\n');
    output.push_str(&format!("Total Chunks: {}", stats.total_chunks));
    output.push('\n');

    if stats.total_documents > 0 {
        let avg = stats.total_chunks / stats.total_documents;
        output.push_str(&format!("Average Chunks/Document: {}", avg));
        output.push('\n');
    }

    if let Some(oldest) = stats.oldest_ingested {
        output.push_str(&format!("Oldest Ingested: {}", format_relative_time(oldest)));
        output.push('\n');
    }

    if let Some(newest) = stats.newest_ingested {
        output.push_str(&format!("Newest Ingested: {}", format_relative_time(newest)));
        output.push('\n');
    }

    output
}

pub fn format_document_list(documents: &[DocumentInfo]) -> String {
    if documents.is_empty() {
        return "No documents ingested".to_string();
    }

    let mut output = String::new();

    output.push_str(
        &format!("{:<24} {:<40} {:<8} {}\n", "ID", "Name", "Chunks", "Ingested")
            .bold()
            .to_string(),
    );
    output.push_str(&"─".repeat(90));
    output.push('\n');

    for doc in documents {
        output.push_str(&format!(
            "{:<24} {:<40} {:<8} {}\n",
            shorten(&doc.id, 24),
            shorten(&doc.name, 40),
            doc.chunks,
            format_relative_time(doc.ingested_at)
        ));
    }

    output
}

fn format_relevance(score: f64, relevance: Relevance) -> String {
    let label = format!("{:.0}% relevant, {}", score * 100.0, relevance);
    match relevance {
        Relevance::High => label.green().to_string(),
        Relevance::Medium => label.yellow().to_string(),
        Relevance::Low => label.bright_black().to_string(),
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        format!("{}...", truncate_chars(content, PREVIEW_CHARS))
    } else {
        content.to_string()
    }
}

fn shorten(input: &str, width: usize) -> String {
    if input.chars().count() > width {
        format!("{}...", truncate_chars(input, width - 3))
    } else {
        input.to_string()
    }
}

fn format_relative_time(dt: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{} days ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{} hours ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{} minutes ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
