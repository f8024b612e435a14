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

//! The Output panel tool.

use super::editor_failure;
use crate::editor_client::EditorClient;
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::{Value, json};

pub fn tool_get_output() -> Tool {
    Tool {
        name: "get_output".to_string(),
        description: "Read the editor's Output panel. With new_only=true, returns only text \
            added since the last checkpointed read; with clear=true, advances the checkpoint \
            so the next new_only read starts after what you just saw."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "new_only": {
                    "type": "boolean",
                    "description": "Return only output since the last checkpoint (default false)"
                },
                "clear": {
                    "type": "boolean",
                    "description": "Advance the checkpoint to the current end of output (default false)"
                }
            }
        }),
    }
}

pub async fn execute_get_output(editor: &EditorClient, args: &Value) -> ToolCallResult {
    let params = json!({
        "new_only": args.get("new_only").and_then(Value::as_bool).unwrap_or(false),
        "clear": args.get("clear").and_then(Value::as_bool).unwrap_or(false),
    });

    match editor.call("get_output", Some(params)).await {
        Ok(result) => {
            let output = result.get("output").and_then(Value::as_str).unwrap_or("");
            if output.is_empty() {
                ToolCallResult::text("(no output)")
            } else {
                ToolCallResult::text(output)
            }
        }
        Err(e) => editor_failure("get_output", e),
    }
}
