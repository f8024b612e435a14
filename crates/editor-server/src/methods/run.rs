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

//! Scene launch and stop.
//!
//! A launch acks immediately; the startup-fault detector delivers the real
//! outcome later under the same request id (see `launch.rs`). The overrides
//! side-file is materialised before playback starts so the game's autoload
//! finds it during `_ready`; a launch without overrides deletes any stale
//! file instead.

use super::{MethodContext, parse_params};
use gdbridge_protocol::envelope::ErrorObject;
use gdbridge_protocol::overrides::{OverrideMap, write_overrides};
use serde_derive::Deserialize;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub enum RunAction {
    Main,
    Path,
    Current,
}

impl RunAction {
    fn name(&self) -> &'static str {
        match self {
            RunAction::Main => "run_main_scene",
            RunAction::Path => "run_scene",
            RunAction::Current => "run_current_scene",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RunParams {
    #[serde(default)]
    scene_path: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<f32>,
    #[serde(default)]
    overrides: Option<OverrideMap>,
}

pub fn run_scene(
    cx: &mut MethodContext,
    params: &str,
    action: RunAction,
) -> Result<Value, ErrorObject> {
    let params: RunParams = parse_params(params)?;

    let scene_path = match action {
        RunAction::Path => Some(
            params
                .scene_path
                .clone()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ErrorObject::invalid_params("missing 'scene_path' parameter"))?,
        ),
        _ => None,
    };

    if cx.ui.is_playing() {
        info!("a scene is already playing; stopping it first");
        cx.ui.stop_playing();
        cx.state.launch.observe_playing(false);
    }

    let overrides_path = cx.state.overrides_path.clone();
    write_overrides(&overrides_path, params.overrides.as_ref())
        .map_err(|e| ErrorObject::internal(format!("failed to write overrides file: {e}")))?;

    match action {
        RunAction::Main => cx.ui.play_main_scene(),
        RunAction::Path => cx.ui.play_scene(scene_path.as_deref().expect("checked above")),
        RunAction::Current => cx.ui.play_current_scene(),
    }

    cx.state
        .launch
        .arm(cx.request_id, cx.client, action.name(), params.timeout_seconds);

    info!(
        action = action.name(),
        scene = scene_path.as_deref().unwrap_or("<default>"),
        "scene launching"
    );
    Ok(json!({
        "status": "launching",
        "action": action.name(),
    }))
}

pub fn stop_scene(cx: &mut MethodContext) -> Result<Value, ErrorObject> {
    let was_playing = cx.ui.is_playing();
    if was_playing {
        cx.ui.stop_playing();
        // Count the transition now rather than waiting for the next frame:
        // the auto-stop timer and any pending-launch record die with it.
        cx.state.launch.observe_playing(false);
    }
    Ok(json!({ "was_playing": was_playing }))
}
