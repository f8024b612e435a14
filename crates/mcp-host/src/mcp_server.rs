// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! MCP Server implementation
//!
//! This module implements the Model Context Protocol server that
//! communicates over stdio using JSON-RPC 2.0. Tool calls fan out to the
//! editor over the stream socket, or to the game over the datagram port;
//! per-call failures stay tool-level results so one bad call never tears
//! down the MCP session.

use crate::editor_client::EditorClient;
use crate::game_client::GameClient;
use crate::mcp_types::*;
use crate::tools;
use eyre::{Result, bail};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// MCP protocol version we support
const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP Server state
pub struct McpServer {
    editor: EditorClient,
    game: GameClient,
    initialized: bool,
    shutdown_requested: bool,
}

impl McpServer {
    pub fn new(editor: EditorClient, game: GameClient) -> Self {
        Self {
            editor,
            game,
            initialized: false,
            shutdown_requested: false,
        }
    }

    /// Run the MCP server over stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        info!("Starting MCP server on stdio");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                info!("EOF on stdin, shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            let response = match serde_json::from_str::<Value>(line) {
                Ok(msg) => self.handle_message(msg).await,
                Err(e) => {
                    error!("Failed to parse JSON: {}", e);
                    Some(JsonRpcResponse::error(
                        RequestId::Number(0),
                        JsonRpcError::parse_error(e.to_string()),
                    ))
                }
            };

            if let Some(resp) = response {
                let response_json = serde_json::to_string(&resp)?;
                debug!("Sending: {}", response_json);
                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }

            if self.shutdown_requested {
                info!("Shutdown complete");
                break;
            }

            // A lost editor socket is terminal: outstanding waiters have
            // already failed, and the host respawns us for the next session.
            if self.editor.is_lost() {
                bail!("editor connection lost; exiting for respawn");
            }
        }

        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    async fn handle_message(&mut self, msg: Value) -> Option<JsonRpcResponse> {
        let id = msg.get("id").cloned();
        let method = msg.get("method").and_then(|m| m.as_str());
        let params = msg.get("params").cloned().unwrap_or(json!({}));

        let method = match method {
            Some(m) => m,
            None => {
                return id.map(|id| {
                    JsonRpcResponse::error(
                        parse_request_id(&id),
                        JsonRpcError::invalid_request("Missing method"),
                    )
                });
            }
        };

        debug!("Handling method: {}", method);

        let result = match method {
            // Lifecycle methods
            "initialize" => self.handle_initialize(&params),
            "initialized" => {
                self.initialized = true;
                info!("Client initialized");
                return None; // Notification, no response
            }
            "shutdown" => {
                info!("Shutdown requested");
                self.shutdown_requested = true;
                Ok(json!({}))
            }

            // Tool methods
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&params).await,

            // Ping
            "ping" => Ok(json!({})),

            // Unknown method
            _ => {
                warn!("Unknown method: {}", method);
                Err(JsonRpcError::method_not_found(method))
            }
        };

        let request_id = id
            .map(|id| parse_request_id(&id))
            .unwrap_or(RequestId::Number(0));

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request_id, value),
            Err(error) => JsonRpcResponse::error(request_id, error),
        })
    }

    /// Handle initialize request
    fn handle_initialize(&mut self, params: &Value) -> Result<Value, JsonRpcError> {
        let _init_params: InitializeParams = serde_json::from_value(params.clone())
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        info!("Initializing MCP server");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "gdbridge-mcp-host".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        Ok(serde_json::to_value(result).unwrap())
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let result = ToolsListResult {
            tools: tools::get_tools(),
        };
        Ok(serde_json::to_value(result).unwrap())
    }

    /// Handle tools/call request
    ///
    /// Per-call failures — editor errors, timeouts, bad parameters — come
    /// back as tool-level error results, never as protocol errors.
    async fn handle_tools_call(&mut self, params: &Value) -> Result<Value, JsonRpcError> {
        let call_params: ToolCallParams = serde_json::from_value(params.clone())
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        let result = tools::execute_tool(
            &self.editor,
            &self.game,
            &call_params.name,
            &call_params.arguments,
        )
        .await;

        Ok(serde_json::to_value(result).unwrap())
    }
}

/// Parse a request ID from JSON value
fn parse_request_id(value: &Value) -> RequestId {
    match value {
        Value::String(s) => RequestId::String(s.clone()),
        Value::Number(n) => RequestId::Number(n.as_i64().unwrap_or(0)),
        _ => RequestId::Number(0),
    }
}
