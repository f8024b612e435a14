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

//! Screenshot tools.
//!
//! `target=editor` goes through the editor server, which composites its
//! viewports. `target=game` bypasses the stream socket entirely and asks the
//! game process directly over the datagram port — the editor has no better
//! view of the game's pixels than the game itself. Either way the PNG lands
//! at a well-known path and is embedded in the reply as image content.

use super::{editor_failure, require_str};
use crate::editor_client::EditorClient;
use crate::game_client::GameClient;
use crate::mcp_types::{Tool, ToolCallResult};
use base64::Engine;
use gdbridge_protocol::datagram::GameCommand;
use serde_json::{Value, json};

pub fn tool_get_screenshot() -> Tool {
    Tool {
        name: "get_screenshot".to_string(),
        description: "Capture a screenshot. target='editor' captures the editor's 2D/3D \
            viewports (combined side by side); target='game' captures the running game's \
            viewport (requires a scene to be playing). The image is returned inline and \
            also written to a well-known path in /tmp."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "enum": ["editor", "game"],
                    "description": "What to capture"
                }
            },
            "required": ["target"]
        }),
    }
}

pub async fn execute_get_screenshot(
    editor: &EditorClient,
    game: &GameClient,
    args: &Value,
) -> ToolCallResult {
    let target = match require_str(args, "target") {
        Ok(target) => target,
        Err(error) => return error,
    };

    let result = match target {
        "editor" => match editor.call("get_screenshot", Some(json!({"target": "editor"}))).await {
            Ok(result) => result,
            Err(e) => return editor_failure("get_screenshot", e),
        },
        "game" => match game.send(&GameCommand::Screenshot).await {
            Ok(result) => result,
            Err(e) => return ToolCallResult::error(format!("get_screenshot failed: {e}")),
        },
        _ => return ToolCallResult::error("'target' must be 'editor' or 'game'"),
    };

    let Some(path) = result.get("path").and_then(Value::as_str) else {
        return ToolCallResult::error("screenshot reply did not name a file");
    };
    let width = result.get("width").and_then(Value::as_u64).unwrap_or(0);
    let height = result.get("height").and_then(Value::as_u64).unwrap_or(0);
    let caption = format!("{target} screenshot: {path} ({width}x{height})");

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let data = base64::engine::general_purpose::STANDARD.encode(bytes);
            ToolCallResult::image_with_text(data, "image/png", caption)
        }
        // The capture was written by another process; if we can't read it
        // back the path is still useful.
        Err(e) => ToolCallResult::text(format!("{caption}\n(could not embed image: {e})")),
    }
}
