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

//! Game-side tools: expression evaluation and synthetic input.
//!
//! These never touch the editor — they go straight to the game helper over
//! the datagram port. Input names are validated here at the tool boundary
//! against the shared mapping tables, so a typo fails fast with a list of
//! what would have been accepted instead of a datagram round trip.

use super::require_str;
use crate::game_client::GameClient;
use crate::mcp_types::{Tool, ToolCallResult};
use gdbridge_protocol::datagram::GameCommand;
use gdbridge_protocol::input::{INPUT_TYPES, InputSpec, key_code, mouse_button_index};
use serde_json::{Value, json};

pub fn tool_evaluate_expression() -> Tool {
    Tool {
        name: "evaluate_expression".to_string(),
        description: "Evaluate an expression inside the running game and return its result. \
            Requires a scene to be playing. If the game has crashed, this times out."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate (e.g. 'get_tree().current_scene.name')"
                }
            },
            "required": ["expression"]
        }),
    }
}

pub fn tool_send_input() -> Tool {
    Tool {
        name: "send_input".to_string(),
        description: "Send a synthetic input event to the running game. type='action' \
            presses/releases a named input-map action; type='key' a keyboard key by name; \
            type='mouse_button' clicks at a position; type='mouse_motion' moves the pointer."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["action", "key", "mouse_button", "mouse_motion"],
                    "description": "Kind of input event"
                },
                "action": {
                    "type": "string",
                    "description": "Input-map action name (type='action')"
                },
                "key": {
                    "type": "string",
                    "description": "Key name, e.g. 'space', 'enter', 'a' (type='key')"
                },
                "button": {
                    "type": "string",
                    "description": "Mouse button name, e.g. 'left', 'right', 'wheel_up' (type='mouse_button')"
                },
                "pressed": {
                    "type": "boolean",
                    "description": "Press (true, default) or release (false)"
                },
                "x": {
                    "type": "number",
                    "description": "Pointer x position (mouse types)"
                },
                "y": {
                    "type": "number",
                    "description": "Pointer y position (mouse types)"
                },
                "relative_x": {
                    "type": "number",
                    "description": "Relative x motion (type='mouse_motion')"
                },
                "relative_y": {
                    "type": "number",
                    "description": "Relative y motion (type='mouse_motion')"
                }
            },
            "required": ["type"]
        }),
    }
}

pub async fn execute_evaluate_expression(game: &GameClient, args: &Value) -> ToolCallResult {
    let expression = match require_str(args, "expression") {
        Ok(expression) => expression.to_string(),
        Err(error) => return error,
    };

    match game.send(&GameCommand::Evaluate { expression }).await {
        Ok(reply) => {
            let result = reply.get("result").and_then(Value::as_str).unwrap_or("");
            ToolCallResult::text(format!("=> {result}"))
        }
        Err(e) => ToolCallResult::error(format!("evaluate_expression failed: {e}")),
    }
}

pub async fn execute_send_input(game: &GameClient, args: &Value) -> ToolCallResult {
    let input_type = match require_str(args, "type") {
        Ok(input_type) => input_type,
        Err(error) => return error,
    };
    if !INPUT_TYPES.contains(&input_type) {
        return ToolCallResult::error(format!(
            "'type' must be one of {}",
            INPUT_TYPES.join(", ")
        ));
    }

    // Fail fast on names the game would reject anyway.
    match input_type {
        "key" => {
            let key = match require_str(args, "key") {
                Ok(key) => key,
                Err(error) => return error,
            };
            if key_code(key).is_none() {
                return ToolCallResult::error(format!("Unknown key name: '{key}'"));
            }
        }
        "mouse_button" => {
            let button = match require_str(args, "button") {
                Ok(button) => button,
                Err(error) => return error,
            };
            if mouse_button_index(button).is_none() {
                return ToolCallResult::error(format!("Unknown mouse button: '{button}'"));
            }
        }
        "action" => {
            if let Err(error) = require_str(args, "action") {
                return error;
            }
        }
        _ => {}
    }

    let event: InputSpec = match serde_json::from_value(args.clone()) {
        Ok(event) => event,
        Err(e) => return ToolCallResult::error(format!("Bad input payload: {e}")),
    };

    match game.send(&GameCommand::Input { event }).await {
        Ok(_) => ToolCallResult::text("Input delivered."),
        Err(e) => ToolCallResult::error(format!("send_input failed: {e}")),
    }
}
