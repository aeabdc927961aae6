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

//! # Octorag
//!
//! Grounded question answering over your own documents.
//!
//! Documents are split into overlapping, sentence-aware chunks, ranked
//! against a query with TF-IDF, and the best passages are handed to a text
//! generation provider together with strict instructions to answer only
//! from them.
//!
//! ```
//! use octorag::knowledge::{ingest, search};
//!
//! let doc = ingest("doc-1", "notes.txt", "Mitochondria mitochondria produce ATP.").unwrap();
//! let results = search("mitochondria", &doc.chunks, 5);
//! assert_eq!(results[0].chunk.source, "notes.txt");
//! ```

pub mod config;
pub mod constants;
pub mod generation;
pub mod knowledge;
pub mod mcp;
pub mod storage;
