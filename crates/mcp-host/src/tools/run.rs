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

//! Scene launch tools.
//!
//! A launch is two-phase on the wire: the editor acks immediately, then its
//! startup-fault detector sends a deferred completion under the same request
//! id once the grace window has elapsed. We wait for that completion (it
//! carries the crash-or-clean verdict), interleave fresh output, and hand
//! the caller one final answer. A scene that stopped inside the window
//! (manual stop, or an auto-stop shorter than the window) never produces a
//! deferred completion; the ack stands and we report what we can observe.

use super::{editor_failure, require_str};
use crate::editor_client::{ClientError, EditorClient};
use crate::mcp_types::{Tool, ToolCallResult};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

/// The server's startup-fault grace window; auto-stops shorter than this
/// skip crash analysis entirely.
const STARTUP_GRACE_SECS: f64 = 1.5;

/// How long to wait for the deferred completion past the grace window.
const DEFERRED_WAIT: Duration = Duration::from_secs(4);

/// Settling delay before sampling output for launches that skip the
/// detector.
const SHORT_RUN_SETTLE: Duration = Duration::from_millis(300);

pub fn tool_run_main_scene() -> Tool {
    Tool {
        name: "run_main_scene".to_string(),
        description: "Run the project's main scene. Waits through the startup check and \
            reports whether the scene is running cleanly or crashed on startup (with the \
            stack trace). Optionally auto-stops after timeout_seconds and applies autoload \
            property overrides for this run."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "timeout_seconds": {
                    "type": "number",
                    "description": "Stop the scene automatically after this many seconds"
                },
                "overrides": {
                    "type": "object",
                    "description": "Autoload property overrides for this run, as {autoload: {property: value}}"
                }
            }
        }),
    }
}

pub fn tool_run_scene() -> Tool {
    Tool {
        name: "run_scene".to_string(),
        description: "Run a specific scene by resource path (e.g. 'res://levels/cave.tscn'). \
            Otherwise behaves like run_main_scene."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "scene_path": {
                    "type": "string",
                    "description": "Resource path of the scene to run (e.g. 'res://main.tscn')"
                },
                "timeout_seconds": {
                    "type": "number",
                    "description": "Stop the scene automatically after this many seconds"
                },
                "overrides": {
                    "type": "object",
                    "description": "Autoload property overrides for this run, as {autoload: {property: value}}"
                }
            },
            "required": ["scene_path"]
        }),
    }
}

pub fn tool_run_current_scene() -> Tool {
    Tool {
        name: "run_current_scene".to_string(),
        description: "Run the scene currently open in the editor. Otherwise behaves like \
            run_main_scene."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "timeout_seconds": {
                    "type": "number",
                    "description": "Stop the scene automatically after this many seconds"
                },
                "overrides": {
                    "type": "object",
                    "description": "Autoload property overrides for this run, as {autoload: {property: value}}"
                }
            }
        }),
    }
}

pub fn tool_stop_scene() -> Tool {
    Tool {
        name: "stop_scene".to_string(),
        description: "Stop the currently playing scene, if any.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub async fn execute_run(editor: &EditorClient, action: &str, args: &Value) -> ToolCallResult {
    let mut params = Map::new();
    if action == "run_scene" {
        match require_str(args, "scene_path") {
            Ok(path) => {
                params.insert("scene_path".to_string(), json!(path));
            }
            Err(error) => return error,
        }
    }

    let timeout_seconds = args.get("timeout_seconds").and_then(Value::as_f64);
    if let Some(t) = timeout_seconds {
        if !(t > 0.0) {
            return ToolCallResult::error("'timeout_seconds' must be a positive number");
        }
        params.insert("timeout_seconds".to_string(), json!(t));
    }
    if let Some(overrides) = args.get("overrides") {
        if !overrides.is_object() {
            return ToolCallResult::error(
                "'overrides' must be an object of {autoload: {property: value}}",
            );
        }
        params.insert("overrides".to_string(), overrides.clone());
    }

    let (id, ack) = match editor
        .request(action, Some(Value::Object(params)), DEFERRED_WAIT, None)
        .await
    {
        Ok(acked) => acked,
        Err(e) => return editor_failure(action, e),
    };
    debug!(action, id, status = ?ack.get("status"), "launch acked");

    // Auto-stops shorter than the grace window mean the detector never
    // runs; don't sit waiting for a completion that cannot come.
    if timeout_seconds.is_some_and(|t| t < STARTUP_GRACE_SECS) {
        tokio::time::sleep(SHORT_RUN_SETTLE).await;
        let output = fetch_new_output(editor).await;
        return ToolCallResult::text(format!(
            "Scene launched ({action}). The {}s auto-stop is shorter than the startup check \
             window, so no crash analysis was performed.{output}",
            timeout_seconds.unwrap_or_default(),
        ));
    }

    match editor.wait_deferred(id, DEFERRED_WAIT).await {
        Ok(outcome) => render_outcome(editor, action, &outcome).await,
        Err(ClientError::Timeout { .. }) => {
            // The pending launch was cleared before the detector ran — the
            // scene was stopped inside the window. The ack stands.
            let output = fetch_new_output(editor).await;
            ToolCallResult::text(format!(
                "Scene launched ({action}) and stopped before the startup check completed \
                 (stopped manually or by a short auto-stop).{output}"
            ))
        }
        Err(e) => editor_failure(action, e),
    }
}

async fn render_outcome(editor: &EditorClient, action: &str, outcome: &Value) -> ToolCallResult {
    let error_detected = outcome
        .get("error_detected")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let warnings = outcome
        .get("warnings")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim();

    if error_detected {
        let stack_trace = outcome
            .get("stack_trace")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        let mut message = format!("Scene crashed on startup ({action}).\n\nStack trace:\n{stack_trace}");
        if !warnings.is_empty() {
            message.push_str(&format!("\n\nWarnings:\n{warnings}"));
        }
        return ToolCallResult::error(message);
    }

    let mut message = format!("Scene is running ({action}).");
    if !warnings.is_empty() {
        message.push_str(&format!("\n\nWarnings:\n{warnings}"));
    }
    message.push_str(&fetch_new_output(editor).await);
    ToolCallResult::text(message)
}

/// Best-effort sample of output produced since the last checkpoint; failures
/// here never mask the launch result.
async fn fetch_new_output(editor: &EditorClient) -> String {
    let params = json!({"new_only": true, "clear": true});
    match editor.call("get_output", Some(params)).await {
        Ok(result) => match result.get("output").and_then(Value::as_str) {
            Some(output) if !output.trim().is_empty() => {
                format!("\n\nOutput:\n{}", output.trim_end())
            }
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}

pub async fn execute_stop_scene(editor: &EditorClient) -> ToolCallResult {
    match editor.call("stop_scene", None).await {
        Ok(result) => {
            let was_playing = result
                .get("was_playing")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if was_playing {
                ToolCallResult::text("Scene stopped.")
            } else {
                ToolCallResult::text("No scene was playing.")
            }
        }
        Err(e) => editor_failure("stop_scene", e),
    }
}
