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

//! MCP tools for driving the Godot editor and its running game.
//!
//! Tools are organised into submodules by the surface they touch:
//!
//! - `run`: scene launch/stop (with startup-fault reporting)
//! - `output`: the editor Output panel
//! - `debugger`: debugger tabs, stepping, breakpoints, monitors
//! - `scene`: the remote scene tree of the running game
//! - `screenshot`: editor and game captures
//! - `game`: expression evaluation and synthetic input (datagram-side)
//! - `util`: connectivity checks
//!
//! Every handler renders its reply as human-readable text, and every
//! per-call failure — editor error, timeout, bad parameter — is a tool-level
//! error result, never a protocol error.

mod debugger;
mod game;
mod output;
mod run;
mod scene;
mod screenshot;
mod util;

use crate::editor_client::{ClientError, EditorClient};
use crate::game_client::GameClient;
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::Value;
use tracing::debug;

/// Get all available tools
pub fn get_tools() -> Vec<Tool> {
    vec![
        // Connectivity
        util::tool_ping(),
        // Scene control
        run::tool_run_main_scene(),
        run::tool_run_scene(),
        run::tool_run_current_scene(),
        run::tool_stop_scene(),
        // Output panel
        output::tool_get_output(),
        // Debugger tabs
        debugger::tool_get_debugger_errors(),
        debugger::tool_get_debugger_stack_trace(),
        debugger::tool_get_debugger_locals(),
        debugger::tool_get_monitors(),
        debugger::tool_get_debugger_state(),
        // Execution control
        debugger::tool_debug_continue(),
        debugger::tool_debug_step(),
        debugger::tool_debug_break(),
        // Breakpoints
        debugger::tool_set_breakpoint(),
        debugger::tool_clear_breakpoints(),
        // Remote scene inspection
        scene::tool_get_remote_scene_tree(),
        scene::tool_get_remote_node_properties(),
        // Screenshots
        screenshot::tool_get_screenshot(),
        // Game-side operations
        game::tool_evaluate_expression(),
        game::tool_send_input(),
    ]
}

/// Execute a tool call
pub async fn execute_tool(
    editor: &EditorClient,
    game: &GameClient,
    name: &str,
    arguments: &Value,
) -> ToolCallResult {
    debug!("Executing tool: {} with args: {}", name, arguments);

    if editor.is_lost() {
        return ToolCallResult::error(
            "Not connected to the editor (the connection was lost). Restart the MCP session.",
        );
    }

    match name {
        "ping" => util::execute_ping(editor).await,
        "run_main_scene" => run::execute_run(editor, "run_main_scene", arguments).await,
        "run_scene" => run::execute_run(editor, "run_scene", arguments).await,
        "run_current_scene" => run::execute_run(editor, "run_current_scene", arguments).await,
        "stop_scene" => run::execute_stop_scene(editor).await,
        "get_output" => output::execute_get_output(editor, arguments).await,
        "get_debugger_errors" => debugger::execute_get_errors(editor).await,
        "get_debugger_stack_trace" => debugger::execute_get_stack_trace(editor).await,
        "get_debugger_locals" => debugger::execute_get_locals(editor, arguments).await,
        "get_monitors" => debugger::execute_get_monitors(editor).await,
        "get_debugger_state" => debugger::execute_get_state(editor).await,
        "debug_continue" => debugger::execute_debug_continue(editor).await,
        "debug_step" => debugger::execute_debug_step(editor, arguments).await,
        "debug_break" => debugger::execute_debug_break(editor).await,
        "set_breakpoint" => debugger::execute_set_breakpoint(editor, arguments).await,
        "clear_breakpoints" => debugger::execute_clear_breakpoints(editor).await,
        "get_remote_scene_tree" => scene::execute_get_remote_scene_tree(editor).await,
        "get_remote_node_properties" => {
            scene::execute_get_remote_node_properties(editor, arguments).await
        }
        "get_screenshot" => screenshot::execute_get_screenshot(editor, game, arguments).await,
        "evaluate_expression" => game::execute_evaluate_expression(game, arguments).await,
        "send_input" => game::execute_send_input(game, arguments).await,
        _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
    }
}

/// Render a failed editor call as the tool-level error the caller sees.
pub(crate) fn editor_failure(operation: &str, err: ClientError) -> ToolCallResult {
    ToolCallResult::error(format!("{operation} failed: {err}"))
}

/// Extract a required string argument.
pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolCallResult> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolCallResult::error(format!("Missing '{key}' parameter")))
}
