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

//! Connectivity tools.

use super::editor_failure;
use crate::editor_client::EditorClient;
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::json;

pub fn tool_ping() -> Tool {
    Tool {
        name: "ping".to_string(),
        description: "Check that the editor is reachable and responding. Returns immediately \
            with the editor's status."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub async fn execute_ping(editor: &EditorClient) -> ToolCallResult {
    match editor.call("ping", None).await {
        Ok(_) => ToolCallResult::text("Editor is responding."),
        Err(e) => editor_failure("ping", e),
    }
}
