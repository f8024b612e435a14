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

//! Debugger tools: tabs, state, stepping, breakpoints, monitors.

use super::{editor_failure, require_str};
use crate::editor_client::{EditorClient, is_pending};
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::{Value, json};

/// Inspector population hint used when the server doesn't send one.
const LOCALS_RETRY_MS: u64 = 300;

/// Strings print bare; anything else prints as JSON.
fn display_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

// ============================================================================
// Tool Definitions
// ============================================================================

pub fn tool_get_debugger_errors() -> Tool {
    Tool {
        name: "get_debugger_errors".to_string(),
        description: "Read the debugger's Errors tab: runtime errors and warnings collected \
            from the running scene, as indented text."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_get_debugger_stack_trace() -> Tool {
    Tool {
        name: "get_debugger_stack_trace".to_string(),
        description: "Read the current stack trace from the debugger (header line plus \
            stack frames). Meaningful while the debugger is paused or after a crash."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_get_debugger_locals() -> Tool {
    Tool {
        name: "get_debugger_locals".to_string(),
        description: "Read local variables from the debugger's inspector. Pass frame_index \
            to select a specific stack frame first (0 is the innermost frame); omit it to \
            read whatever frame is currently selected."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "frame_index": {
                    "type": "integer",
                    "description": "Stack frame to select before reading (0-based); omit for the current selection"
                }
            }
        }),
    }
}

pub fn tool_get_monitors() -> Tool {
    Tool {
        name: "get_monitors".to_string(),
        description: "Read the engine performance monitors (FPS, memory, objects, etc.) \
            grouped the way the profiler panel shows them."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_get_debugger_state() -> Tool {
    Tool {
        name: "get_debugger_state".to_string(),
        description: "Report whether a debug session is active, paused, and debuggable."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_debug_continue() -> Tool {
    Tool {
        name: "debug_continue".to_string(),
        description: "Resume execution of the paused debug session.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_debug_step() -> Tool {
    Tool {
        name: "debug_step".to_string(),
        description: "Step the paused debug session. mode selects the granularity: 'into' \
            steps into calls, 'over' steps over them, 'out' runs to the caller."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "enum": ["into", "over", "out"],
                    "description": "Stepping granularity"
                }
            },
            "required": ["mode"]
        }),
    }
}

pub fn tool_debug_break() -> Tool {
    Tool {
        name: "debug_break".to_string(),
        description: "Ask the running debug session to pause at the next opportunity."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_set_breakpoint() -> Tool {
    Tool {
        name: "set_breakpoint".to_string(),
        description: "Set (or disable) a breakpoint at a script line. Lines are 1-indexed \
            as shown in the script editor. The breakpoint is applied to the script editor \
            and, when a session is running, pushed to the live debugger too."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Script resource path (e.g. 'res://player.gd')"
                },
                "line": {
                    "type": "integer",
                    "description": "1-indexed line number"
                },
                "enabled": {
                    "type": "boolean",
                    "description": "Set false to disable an existing breakpoint (default true)"
                }
            },
            "required": ["path", "line"]
        }),
    }
}

pub fn tool_clear_breakpoints() -> Tool {
    Tool {
        name: "clear_breakpoints".to_string(),
        description: "Remove every breakpoint from the project.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

pub async fn execute_get_errors(editor: &EditorClient) -> ToolCallResult {
    match editor.call("get_debugger_errors", None).await {
        Ok(result) => {
            let errors = result.get("errors").and_then(Value::as_str).unwrap_or("");
            if errors.trim().is_empty() {
                ToolCallResult::text("No errors in the debugger's Errors tab.")
            } else {
                ToolCallResult::text(errors)
            }
        }
        Err(e) => editor_failure("get_debugger_errors", e),
    }
}

pub async fn execute_get_stack_trace(editor: &EditorClient) -> ToolCallResult {
    match editor.call("get_debugger_stack_trace", None).await {
        Ok(result) => {
            let trace = result
                .get("stack_trace")
                .and_then(Value::as_str)
                .unwrap_or("");
            if trace.trim().is_empty() {
                ToolCallResult::text("No stack trace available (the debugger is not paused).")
            } else {
                ToolCallResult::text(trace)
            }
        }
        Err(e) => editor_failure("get_debugger_stack_trace", e),
    }
}

pub async fn execute_get_locals(editor: &EditorClient, args: &Value) -> ToolCallResult {
    let mut params = serde_json::Map::new();
    if let Some(frame_index) = args.get("frame_index") {
        let Some(index) = frame_index.as_i64() else {
            return ToolCallResult::error("'frame_index' must be an integer");
        };
        params.insert("frame_index".to_string(), json!(index));
    }

    let result = editor
        .call_with_pending_retry(
            "get_debugger_locals",
            Some(Value::Object(params)),
            LOCALS_RETRY_MS,
        )
        .await;
    match result {
        Ok(result) => {
            if is_pending(&result) {
                return ToolCallResult::text(
                    "Locals are not populated yet — the inspector is still filling. \
                     Call get_debugger_locals again in a moment.",
                );
            }
            let Some(locals) = result.get("locals").and_then(Value::as_object) else {
                return ToolCallResult::text("No locals available.");
            };
            if locals.is_empty() {
                return ToolCallResult::text("No locals available.");
            }
            let mut lines: Vec<String> = locals
                .iter()
                .map(|(name, value)| format!("{name} = {}", display_value(value)))
                .collect();
            lines.sort();
            ToolCallResult::text(lines.join("\n"))
        }
        Err(e) => editor_failure("get_debugger_locals", e),
    }
}

pub async fn execute_get_monitors(editor: &EditorClient) -> ToolCallResult {
    match editor.call("get_monitors", None).await {
        Ok(result) => {
            let Some(groups) = result.get("monitors").and_then(Value::as_object) else {
                return ToolCallResult::text("No monitor data available.");
            };
            let mut text = String::new();
            for (group, metrics) in groups {
                text.push_str(group);
                text.push('\n');
                if let Some(metrics) = metrics.as_object() {
                    for (name, value) in metrics {
                        text.push_str(&format!("  {name}: {}\n", display_value(value)));
                    }
                }
            }
            if text.is_empty() {
                ToolCallResult::text("No monitor data available.")
            } else {
                ToolCallResult::text(text)
            }
        }
        Err(e) => editor_failure("get_monitors", e),
    }
}

pub async fn execute_get_state(editor: &EditorClient) -> ToolCallResult {
    match editor.call("get_debugger_state", None).await {
        Ok(result) => {
            let flag = |key: &str| {
                result
                    .get(key)
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            ToolCallResult::text(format!(
                "active: {}\npaused: {}\ndebuggable: {}",
                flag("active"),
                flag("paused"),
                flag("debuggable"),
            ))
        }
        Err(e) => editor_failure("get_debugger_state", e),
    }
}

pub async fn execute_debug_continue(editor: &EditorClient) -> ToolCallResult {
    match editor.call("debug_continue", None).await {
        Ok(_) => ToolCallResult::text("Execution resumed."),
        Err(e) => editor_failure("debug_continue", e),
    }
}

pub async fn execute_debug_step(editor: &EditorClient, args: &Value) -> ToolCallResult {
    let mode = match require_str(args, "mode") {
        Ok(mode) => mode,
        Err(error) => return error,
    };
    if !["into", "over", "out"].contains(&mode) {
        return ToolCallResult::error("'mode' must be one of 'into', 'over', 'out'");
    }

    match editor
        .call("debug_step", Some(json!({"mode": mode})))
        .await
    {
        Ok(_) => ToolCallResult::text(format!("Stepped {mode}.")),
        Err(e) => editor_failure("debug_step", e),
    }
}

pub async fn execute_debug_break(editor: &EditorClient) -> ToolCallResult {
    match editor.call("debug_break", None).await {
        Ok(_) => ToolCallResult::text("Break requested; the session will pause at the next opportunity."),
        Err(e) => editor_failure("debug_break", e),
    }
}

pub async fn execute_set_breakpoint(editor: &EditorClient, args: &Value) -> ToolCallResult {
    let path = match require_str(args, "path") {
        Ok(path) => path.to_string(),
        Err(error) => return error,
    };
    let Some(line) = args.get("line").and_then(Value::as_u64).filter(|l| *l >= 1) else {
        return ToolCallResult::error("'line' must be a positive integer (1-indexed)");
    };
    let enabled = args
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let params = json!({"path": path, "line": line, "enabled": enabled});
    match editor.call("set_breakpoint", Some(params)).await {
        Ok(result) => {
            let count = result.get("count").and_then(Value::as_u64).unwrap_or(0);
            let verb = if enabled { "set" } else { "disabled" };
            ToolCallResult::text(format!(
                "Breakpoint {verb} at {path}:{line} ({count} breakpoint(s) total)."
            ))
        }
        Err(e) => editor_failure("set_breakpoint", e),
    }
}

pub async fn execute_clear_breakpoints(editor: &EditorClient) -> ToolCallResult {
    match editor.call("clear_breakpoints", None).await {
        Ok(_) => ToolCallResult::text("All breakpoints cleared."),
        Err(e) => editor_failure("clear_breakpoints", e),
    }
}
