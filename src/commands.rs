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

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use octorag::config::Config;
use octorag::generation::{create_generation_provider, GenerationProvider};
use octorag::knowledge::formatting::{
    format_answer, format_chunks, format_document_list, format_questions, format_search_results,
    format_stats,
};
use octorag::knowledge::ingest::{document_name_for, extract_text_from_file};
use octorag::knowledge::{DocumentLibrary, GroundedAnswerer, Retriever, TextChunker};
use octorag::mcp::logging::init_mcp_logging;
use octorag::mcp::McpServer;

use crate::cli::{Commands, OutputFormat};

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest { files, format } => {
            let library = load_library(config, &files)?;
            match format {
                OutputFormat::Json => print_json(library.documents())?,
                OutputFormat::Text => {
                    println!("{}", format_document_list(&library.list()));
                    for document in library.documents() {
                        println!("{}", format_chunks(document));
                    }
                    println!("{}", format_stats(&library.stats()));
                }
            }
        }

        Commands::Search {
            query,
            files,
            limit,
            threshold,
            format,
        } => {
            let library = load_library(config, &files)?;
            let mut retriever = Retriever::new(&config.retrieval);
            if let Some(limit) = limit {
                retriever = retriever.with_max_results(limit);
            }
            if let Some(threshold) = threshold {
                retriever = retriever.with_threshold(threshold);
            }

            let chunks: Vec<_> = library
                .documents()
                .iter()
                .flat_map(|d| d.chunks.iter())
                .collect();
            let results = retriever.search(&query, &chunks);

            match format {
                OutputFormat::Json => print_json(&results)?,
                OutputFormat::Text => print!("{}", format_search_results(&results)),
            }
        }

        Commands::Ask {
            question,
            files,
            language,
            format,
        } => {
            let library = load_library(config, &files)?;
            let answerer = GroundedAnswerer::from_config(generation_provider(config)?, config);
            let answer = answerer
                .answer(&question, library.documents(), &language)
                .await;

            match format {
                OutputFormat::Json => print_json(&answer)?,
                OutputFormat::Text => print!("{}", format_answer(&answer)),
            }
            if answer.is_error() {
                anyhow::bail!("Answer generation failed");
            }
        }

        Commands::Questions {
            files,
            topic,
            count,
            language,
            format,
        } => {
            let library = load_library(config, &files)?;
            let answerer = GroundedAnswerer::from_config(generation_provider(config)?, config);
            let questions = answerer
                .generate_questions(topic.as_deref(), library.documents(), count, &language)
                .await;

            match format {
                OutputFormat::Json => print_json(&questions)?,
                OutputFormat::Text => println!("{}", format_questions(&questions)),
            }
            if questions.error.is_some() {
                anyhow::bail!("Question generation failed");
            }
        }

        Commands::Mcp { debug } => {
            init_mcp_logging(debug)?;
            McpServer::new(config).run().await?;
        }
    }

    Ok(())
}

/// Extract and ingest every file; the path is the document id
fn load_library(config: &Config, files: &[PathBuf]) -> Result<DocumentLibrary> {
    let mut library = DocumentLibrary::new(TextChunker::new(&config.chunking));
    for path in files {
        let text = extract_text_from_file(path)?;
        library.add(&path.display().to_string(), &document_name_for(path), &text)?;
    }
    info!(
        documents = library.len(),
        chunks = library.stats().total_chunks,
        "Loaded documents"
    );
    Ok(library)
}

fn generation_provider(config: &Config) -> Result<Arc<dyn GenerationProvider>> {
    let provider = create_generation_provider(&config.generation)
        .context("Failed to create generation provider")?;
    Ok(Arc::from(provider))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
