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

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::generation::{create_generation_provider, GenerationProvider};
use crate::mcp::documents::DocumentsProvider;
use crate::mcp::types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpError, METHOD_NOT_FOUND, PARSE_ERROR,
};

/// MCP server exposing the document tools over stdio
pub struct McpServer {
    documents: DocumentsProvider,
}

impl McpServer {
    pub fn new(config: &Config) -> Self {
        // Search and ingestion stay usable without generation credentials
        let provider: Option<Arc<dyn GenerationProvider>> =
            match create_generation_provider(&config.generation) {
                Ok(provider) => Some(Arc::from(provider)),
                Err(e) => {
                    warn!(error = %e, "Generation provider unavailable, answer tools disabled");
                    None
                }
            };

        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: &Config, provider: Option<Arc<dyn GenerationProvider>>) -> Self {
        Self {
            documents: DocumentsProvider::new(config, provider),
        }
    }

    /// Run the MCP server on stdio
    pub async fn run(&self) -> Result<()> {
        let stdin = stdin();
        let mut stdout = stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();
        info!("MCP server listening on stdio");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                debug!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!("Received request: {}", trimmed);

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => {
                    // Notifications carry no id and get no reply
                    if request.id.is_none() {
                        debug!(method = %request.method, "Notification received");
                        continue;
                    }
                    self.handle_request(request).await
                }
                Err(e) => JsonRpcResponse::failure(
                    None,
                    JsonRpcError {
                        code: PARSE_ERROR,
                        message: format!("Parse error: {}", e),
                        data: None,
                    },
                ),
            };

            let response_json = serde_json::to_string(&response)?;
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        Ok(())
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {
                        "tools": {}
                    },
                    "serverInfo": {
                        "name": "octorag",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),

            "ping" => JsonRpcResponse::success(id, json!({})),

            "tools/list" => {
                let tools = DocumentsProvider::get_tool_definitions();
                JsonRpcResponse::success(id, json!({ "tools": tools }))
            }

            "tools/call" => {
                let params = request.params.unwrap_or(json!({}));
                let tool_name = params["name"].as_str().unwrap_or("");
                let arguments = &params["arguments"];
                debug!(tool = tool_name, "Calling tool");

                let result = match tool_name {
                    "ingest_document" => self.documents.execute_ingest_document(arguments).await,
                    "list_documents" => self.documents.execute_list_documents(arguments).await,
                    "remove_document" => self.documents.execute_remove_document(arguments).await,
                    "search_documents" => self.documents.execute_search_documents(arguments).await,
                    "ask_documents" => self.documents.execute_ask_documents(arguments).await,
                    "generate_questions" => {
                        self.documents.execute_generate_questions(arguments).await
                    }
                    _ => Err(McpError::method_not_found(
                        format!("Unknown tool: {}", tool_name),
                        "tools/call",
                    )),
                };

                match result {
                    Ok(content) => JsonRpcResponse::success(
                        id,
                        json!({
                            "content": [{
                                "type": "text",
                                "text": content
                            }]
                        }),
                    ),
                    Err(e) => {
                        warn!(tool = tool_name, error = %e, "Tool call failed");
                        JsonRpcResponse::failure(id, e.into_jsonrpc())
                    }
                }
            }

            _ => JsonRpcResponse::failure(
                id,
                JsonRpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: serde_json::Value) -> JsonRpcRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_tools_list() {
        let server = McpServer::with_provider(&Config::default(), None);

        let init = server
            .handle_request(request(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" })))
            .await;
        assert_eq!(init.result.unwrap()["serverInfo"]["name"], "octorag");

        let list = server
            .handle_request(request(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" })))
            .await;
        let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 6);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let server = McpServer::with_provider(&Config::default(), None);
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {
                    "name": "ingest_document",
                    "arguments": { "id": "d1", "content": "Short note." }
                }
            })))
            .await;
        let text = response.result.unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("\"document_id\": \"d1\""));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let server = McpServer::with_provider(&Config::default(), None);
        let unknown_tool = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": { "name": "teleport", "arguments": {} }
            })))
            .await;
        assert_eq!(unknown_tool.error.unwrap().code, METHOD_NOT_FOUND);

        let unknown_method = server
            .handle_request(request(json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" })))
            .await;
        assert_eq!(unknown_method.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
