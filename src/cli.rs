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

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "octorag")]
#[command(version, author = "Muvon Un Limited <opensource@muvon.io>")]
#[command(about = "Grounded question answering over your own documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk documents and show the resulting chunks
    Ingest {
        /// Files to ingest (.txt, .md, .html, .pdf)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rank the passages of the given documents against a query
    Search {
        /// What to look for
        query: String,

        /// Documents to search (repeatable)
        #[arg(short = 'F', long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of passages to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum relevance score (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Answer a question strictly from the given documents
    Ask {
        /// The question
        question: String,

        /// Documents to answer from (repeatable)
        #[arg(short = 'F', long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Answer language code (en, es, fr, ...)
        #[arg(short = 'L', long, default_value = "en")]
        language: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate study questions from the given documents
    Questions {
        /// Documents to draw questions from (repeatable)
        #[arg(short = 'F', long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Focus topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Number of questions
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Question language code
        #[arg(short = 'L', long, default_value = "en")]
        language: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Start MCP server (Model Context Protocol) exposing document tools
    Mcp {
        /// Log at debug level
        #[arg(long)]
        debug: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "octorag", "ask", "What is osmosis?", "-F", "a.txt", "--file", "b.pdf", "-L", "es",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                question,
                files,
                language,
                format,
            } => {
                assert_eq!(question, "What is osmosis?");
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.pdf")]);
                assert_eq!(language, "es");
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_requires_file() {
        assert!(Cli::try_parse_from(["octorag", "search", "enzymes"]).is_err());
    }

    #[test]
    fn test_parse_questions_defaults() {
        let cli =
            Cli::try_parse_from(["octorag", "questions", "-F", "notes.md", "--format", "json"])
                .unwrap();
        match cli.command {
            Commands::Questions {
                topic,
                count,
                format,
                ..
            } => {
                assert!(topic.is_none());
                assert_eq!(count, 5);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
