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

//! Remote scene inspection tools.
//!
//! Both tools speak the pending protocol: the editor arms the UI (presses
//! the Remote toggle, selects the node) and asks us to retry. We retry
//! exactly once after the hinted delay; if the panel still hasn't populated
//! the caller gets a friendly "not yet" rather than an error or an endless
//! poll.

use super::{editor_failure, require_str};
use crate::editor_client::{EditorClient, is_pending};
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::{Value, json};

/// Tree population hint used when the server doesn't send one.
const TREE_RETRY_MS: u64 = 150;
/// Inspector population hint used when the server doesn't send one.
const INSPECTOR_RETRY_MS: u64 = 300;

pub fn tool_get_remote_scene_tree() -> Tool {
    Tool {
        name: "get_remote_scene_tree".to_string(),
        description: "Read the live scene tree of the running game (the editor's Remote \
            tree), as indented node names. Requires a scene to be playing."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_get_remote_node_properties() -> Tool {
    Tool {
        name: "get_remote_node_properties".to_string(),
        description: "Inspect a node of the running game by its remote scene tree path \
            (e.g. '/root/Main/Player') and return its properties as shown in the inspector."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Node path in the remote tree (e.g. '/root/Main/Player')"
                }
            },
            "required": ["path"]
        }),
    }
}

pub async fn execute_get_remote_scene_tree(editor: &EditorClient) -> ToolCallResult {
    let result = editor
        .call_with_pending_retry("get_remote_scene_tree", None, TREE_RETRY_MS)
        .await;
    match result {
        Ok(result) => {
            if is_pending(&result) {
                return ToolCallResult::text(
                    "The remote scene tree has not populated yet. Call get_remote_scene_tree \
                     again in a moment.",
                );
            }
            let tree = result.get("tree").and_then(Value::as_str).unwrap_or("");
            if tree.trim().is_empty() {
                ToolCallResult::text("The remote scene tree is empty.")
            } else {
                ToolCallResult::text(tree)
            }
        }
        Err(e) => editor_failure("get_remote_scene_tree", e),
    }
}

pub async fn execute_get_remote_node_properties(
    editor: &EditorClient,
    args: &Value,
) -> ToolCallResult {
    let path = match require_str(args, "path") {
        Ok(path) => path.to_string(),
        Err(error) => return error,
    };

    let result = editor
        .call_with_pending_retry(
            "get_remote_node_properties",
            Some(json!({"path": path})),
            INSPECTOR_RETRY_MS,
        )
        .await;
    match result {
        Ok(result) => {
            if is_pending(&result) {
                return ToolCallResult::text(format!(
                    "The inspector has not populated for {path} yet. Call \
                     get_remote_node_properties again in a moment."
                ));
            }
            let Some(properties) = result.get("properties").and_then(Value::as_object) else {
                return ToolCallResult::text(format!("No properties reported for {path}."));
            };
            let mut text = format!("{path}\n");
            for (name, value) in properties {
                let rendered = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                text.push_str(&format!("  {name} = {rendered}\n"));
            }
            ToolCallResult::text(text)
        }
        Err(e) => editor_failure("get_remote_node_properties", e),
    }
}
