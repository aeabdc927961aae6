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
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt::Layer, prelude::*, registry::Registry, EnvFilter};

/// Initialize logging for the MCP server with daily file rotation.
/// Nothing is written to stdout or stderr: stdout carries the protocol.
pub fn init_mcp_logging(debug_mode: bool) -> Result<PathBuf, anyhow::Error> {
    let log_dir = crate::storage::get_log_dir()?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "mcp_server.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("info,octorag=debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // Structured JSON lines
    let file_layer = Layer::new()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .json();

    Registry::default()
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install MCP log subscriber: {}", e))?;

    info!(
        log_directory = %log_dir.display(),
        debug_mode,
        "MCP server logging initialized"
    );

    Ok(log_dir)
}
