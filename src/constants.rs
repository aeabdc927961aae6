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

/// Default chunk length in bytes of normalized text
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of bytes shared by consecutive chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Chunks must be longer than this many characters to be kept.
/// Also the tail length at which chunking stops.
pub const MIN_CHUNK_LENGTH: usize = 50;

/// Query terms of this many characters or fewer are ignored
pub const MIN_TERM_LENGTH: usize = 2;

/// Minimum TF-IDF score for a chunk to be retrieved
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Scores at or above this are `high` relevance
pub const HIGH_RELEVANCE_THRESHOLD: f64 = 0.7;

/// Scores at or above this (and below high) are `medium` relevance
pub const MEDIUM_RELEVANCE_THRESHOLD: f64 = 0.5;

/// Default number of ranked chunks returned by a search
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default number of study questions to request
pub const DEFAULT_QUESTION_COUNT: usize = 5;

/// Language code that needs no explicit response-language directive
pub const DEFAULT_LANGUAGE: &str = "en";

/// Returned by the context builder when nothing cleared the threshold
pub const NO_CONTEXT_SENTINEL: &str = "No relevant information found in the uploaded documents.";
