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

//! Editor-side method handlers, organised by the panel they drive:
//!
//! - `run`: scene launch/stop and the launch bookkeeping
//! - `output`: the Output panel mirror
//! - `debugger`: debugger tabs, state, stepping, breakpoints
//! - `scene`: the remote scene tree and remote node inspection
//! - `screenshot`: editor viewport capture
//!
//! Handlers return either a result body or a wire error object. They never
//! block: anything that needs the UI to catch up returns a `pending` result
//! and lets the adapter retry.

mod debugger;
mod output;
mod run;
mod scene;
mod screenshot;

use crate::editor::EditorUi;
use crate::server::ServerState;
use crate::transport::ClientKey;
use gdbridge_protocol::envelope::ErrorObject;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Everything a handler can see for one request.
pub struct MethodContext<'a> {
    pub state: &'a mut ServerState,
    pub ui: &'a mut dyn EditorUi,
    pub request_id: u64,
    pub client: ClientKey,
}

/// The flat dispatch table.
pub fn dispatch(method: &str, params: &str, cx: &mut MethodContext) -> Result<Value, ErrorObject> {
    match method {
        "ping" => Ok(json!({"status": "ok"})),

        "run_main_scene" => run::run_scene(cx, params, run::RunAction::Main),
        "run_scene" => run::run_scene(cx, params, run::RunAction::Path),
        "run_current_scene" => run::run_scene(cx, params, run::RunAction::Current),
        "stop_scene" => run::stop_scene(cx),

        "get_output" => output::get_output(cx, params),

        "get_debugger_errors" => debugger::get_errors(cx),
        "get_debugger_stack_trace" => debugger::get_stack_trace(cx),
        "get_debugger_locals" => debugger::get_locals(cx, params),
        "get_monitors" => debugger::get_monitors(cx),
        "get_debugger_state" => debugger::get_state(cx),
        "debug_continue" => debugger::debug_continue(cx),
        "debug_step" => debugger::debug_step(cx, params),
        "debug_break" => debugger::debug_break(cx),
        "set_breakpoint" => debugger::set_breakpoint(cx, params),
        "clear_breakpoints" => debugger::clear_breakpoints(cx),

        "get_remote_scene_tree" => scene::get_remote_scene_tree(cx),
        "get_remote_node_properties" => scene::get_remote_node_properties(cx, params),

        "get_screenshot" => screenshot::get_screenshot(cx),

        _ => Err(ErrorObject::method_not_found(method)),
    }
}

/// Parse a handler's parameter object from the re-serialised params string.
/// Absent params deserialise as the type's default.
pub(crate) fn parse_params<T>(params: &str) -> Result<T, ErrorObject>
where
    T: DeserializeOwned + Default,
{
    let value: Value = serde_json::from_str(params)
        .map_err(|e| ErrorObject::invalid_params(format!("bad params: {e}")))?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| ErrorObject::invalid_params(format!("bad params: {e}")))
}

/// The shared "widget isn't there" failure, always −32000 with a hint about
/// why the panel might be missing.
pub(crate) fn panel_missing(what: &str, hint: &str) -> ErrorObject {
    ErrorObject::internal(format!("{what} not found ({hint})"))
}

/// Build a `pending` result: precondition armed, retry in about
/// `retry_after_ms`.
pub(crate) fn pending_result(message: &str, retry_after_ms: u64) -> Value {
    json!({
        "pending": true,
        "message": message,
        "retry_after_ms": retry_after_ms,
    })
}
