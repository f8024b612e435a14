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

//! Launch lifecycle: the launch counter, the auto-stop timer, and the
//! startup-fault detector.
//!
//! A scene launch is acked immediately; whether it actually survived
//! startup is only knowable after the debugger has had a moment to populate.
//! Each launch therefore registers a pending-launch record with a check-due
//! countdown; when it elapses the detector inspects the debugger widgets
//! exactly once and sends one deferred reply under the original request id.
//! A play→stop transition observed before the window elapses clears the
//! record, and the ack stands as the final reply — which also means a launch
//! whose auto-stop timeout is shorter than the grace window never gets
//! startup-fault analysis.
//!
//! The launch counter invalidates stale timers: it is bumped by every
//! launch and every observed play→stop transition, and an auto-stop only
//! fires while its captured counter value is still current.

use crate::editor::EditorUi;
use crate::widgets::{EditorWidget, WidgetCache, linearize_tree};
use gdbridge_protocol::envelope::Reply;
use serde_json::json;
use tracing::{debug, info};

/// Seconds after a launch before the startup-fault detector runs.
pub const STARTUP_GRACE_SECS: f32 = 1.5;

/// Client key + reply frame for a deferred completion.
pub type DeferredReply = (u64, Reply);

#[derive(Debug)]
struct AutoStop {
    launch_id: u64,
    remaining: f32,
}

#[derive(Debug)]
struct PendingLaunch {
    request_id: u64,
    client: u64,
    action: String,
    due_in: f32,
}

#[derive(Debug, Default)]
pub struct LaunchState {
    counter: u64,
    auto_stop: Option<AutoStop>,
    pending: Option<PendingLaunch>,
    observed_playing: bool,
}

impl LaunchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Record a fresh launch: bump the counter, arm the auto-stop when a
    /// positive timeout was requested, and register the pending-launch
    /// record for the detector. Callers start playback first; `is_playing`
    /// is already true here.
    pub fn arm(
        &mut self,
        request_id: u64,
        client: u64,
        action: &str,
        timeout_seconds: Option<f32>,
    ) {
        self.counter += 1;
        self.observed_playing = true;
        self.auto_stop = timeout_seconds
            .filter(|t| *t > 0.0)
            .map(|t| AutoStop {
                launch_id: self.counter,
                remaining: t,
            });
        self.pending = Some(PendingLaunch {
            request_id,
            client,
            action: action.to_string(),
            due_in: STARTUP_GRACE_SECS,
        });
        debug!(launch_id = self.counter, action, ?timeout_seconds, "launch armed");
    }

    /// Feed the playing flag once per frame. A play→stop transition bumps
    /// the counter (invalidating in-flight auto-stops) and clears any
    /// pending-launch record, whatever caused the stop.
    pub fn observe_playing(&mut self, playing: bool) {
        if self.observed_playing && !playing {
            self.counter += 1;
            self.auto_stop = None;
            if self.pending.take().is_some() {
                debug!("scene stopped inside the grace window; detector suppressed");
            }
        }
        self.observed_playing = playing;
    }

    /// Count down the auto-stop and the detector window. Returns the
    /// deferred reply to deliver when the detector ran this frame.
    pub fn tick(
        &mut self,
        delta: f32,
        ui: &mut dyn EditorUi,
        widgets: &mut WidgetCache,
    ) -> Option<DeferredReply> {
        self.tick_auto_stop(delta, ui);

        let due = match &mut self.pending {
            Some(p) => {
                p.due_in -= delta;
                p.due_in <= 0.0
            }
            None => false,
        };
        if !due {
            return None;
        }
        let record = self.pending.take()?;
        Some(self.run_detector(record, ui, widgets))
    }

    fn tick_auto_stop(&mut self, delta: f32, ui: &mut dyn EditorUi) {
        let fire = match &mut self.auto_stop {
            Some(stop) if stop.launch_id == self.counter => {
                stop.remaining -= delta;
                stop.remaining <= 0.0
            }
            Some(_) => {
                // A newer launch or a stop superseded this timer.
                self.auto_stop = None;
                return;
            }
            None => return,
        };
        if fire {
            self.auto_stop = None;
            if ui.is_playing() {
                info!("auto-stop timeout elapsed, stopping scene");
                ui.stop_playing();
            }
        }
    }

    /// Runs exactly once per pending-launch record: decide whether the
    /// launch crashed on startup and build the deferred reply.
    fn run_detector(
        &mut self,
        record: PendingLaunch,
        ui: &mut dyn EditorUi,
        widgets: &mut WidgetCache,
    ) -> DeferredReply {
        // The debugger panels are recreated across play cycles; drop every
        // cached handle before looking.
        widgets.invalidate();

        let header = widgets
            .locate(ui, EditorWidget::StackTraceLabel)
            .and_then(|id| ui.label_text(id))
            .unwrap_or_default();
        let frames = widgets
            .locate(ui, EditorWidget::StackFramesTree)
            .and_then(|id| ui.tree_snapshot(id))
            .map(|t| linearize_tree(&t))
            .unwrap_or_default();
        let warnings = widgets
            .locate(ui, EditorWidget::ErrorsTree)
            .and_then(|id| ui.tree_snapshot(id))
            .map(|t| linearize_tree(&t))
            .unwrap_or_default();

        let error_detected = header.to_lowercase().contains("error") || !frames.trim().is_empty();

        let stack_trace = if error_detected {
            if ui.is_playing() {
                info!(action = %record.action, "startup fault detected, stopping scene");
                ui.stop_playing();
            }
            format!("{header}\n---\n{frames}")
        } else {
            String::new()
        };

        let reply = Reply::result(
            record.request_id,
            json!({
                "success": !error_detected,
                "action": record.action,
                "error_detected": error_detected,
                "stack_trace": stack_trace,
                "warnings": warnings,
            }),
        );
        (record.client, reply)
    }

    /// Whether a pending-launch record is currently armed (test support).
    pub fn has_pending_launch(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TreeNode;
    use crate::testing::FakeEditor;
    use pretty_assertions::assert_eq;

    fn tick_for(
        state: &mut LaunchState,
        ed: &mut FakeEditor,
        widgets: &mut WidgetCache,
        secs: f32,
        step: f32,
    ) -> Option<DeferredReply> {
        let mut elapsed = 0.0;
        while elapsed < secs {
            state.observe_playing(ed.is_playing());
            if let Some(reply) = state.tick(step, ed, widgets) {
                return Some(reply);
            }
            elapsed += step;
        }
        None
    }

    #[test]
    fn detector_reports_success_for_a_clean_launch() {
        let mut ed = FakeEditor::new();
        ed.play_main_scene();
        let mut widgets = WidgetCache::new();
        let mut state = LaunchState::new();
        state.arm(9, 1, "run_main_scene", None);

        let (client, reply) = tick_for(&mut state, &mut ed, &mut widgets, 2.0, 0.1).unwrap();
        assert_eq!(client, 1);
        assert_eq!(reply.id, 9);
        let result = reply.result.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["error_detected"], false);
        // A clean launch is left running.
        assert!(ed.is_playing());
    }

    #[test]
    fn detector_stops_a_crashed_scene_and_carries_the_trace() {
        let mut ed = FakeEditor::new();
        let label = ed.add_widget("Label", "/root/EditorDebuggerNode/Stack/Label");
        ed.set_label_text(label, "Error: division by zero");
        let frames = ed.add_widget("Tree", "/root/EditorDebuggerNode/Stack/Tree");
        ed.set_tree(
            frames,
            TreeNode::branch(&[], vec![TreeNode::leaf(&["0", "_ready", "res://a.gd:3"])]),
        );
        ed.play_main_scene();

        let mut widgets = WidgetCache::new();
        let mut state = LaunchState::new();
        state.arm(4, 2, "run_main_scene", None);

        let (_, reply) = tick_for(&mut state, &mut ed, &mut widgets, 2.0, 0.1).unwrap();
        let result = reply.result.unwrap();
        assert_eq!(result["error_detected"], true);
        assert_eq!(result["success"], false);
        let trace = result["stack_trace"].as_str().unwrap();
        assert!(trace.contains("Error: division by zero"));
        assert!(trace.contains("res://a.gd:3"));
        assert!(!ed.is_playing());
    }

    #[test]
    fn stop_inside_the_grace_window_suppresses_the_detector() {
        let mut ed = FakeEditor::new();
        ed.play_main_scene();
        let mut widgets = WidgetCache::new();
        let mut state = LaunchState::new();
        state.arm(4, 1, "run_main_scene", None);

        assert!(tick_for(&mut state, &mut ed, &mut widgets, 0.5, 0.1).is_none());
        ed.stop_playing();

        assert!(tick_for(&mut state, &mut ed, &mut widgets, 3.0, 0.1).is_none());
        assert!(!state.has_pending_launch());
    }

    #[test]
    fn auto_stop_fires_only_while_its_launch_is_current() {
        let mut ed = FakeEditor::new();
        ed.play_main_scene();
        let mut widgets = WidgetCache::new();
        let mut state = LaunchState::new();
        state.arm(1, 1, "run_main_scene", Some(5.0));
        let launched_at = state.counter();

        // Manual stop after 1s: counter bumps once, timer dies with it.
        tick_for(&mut state, &mut ed, &mut widgets, 1.0, 0.1);
        ed.stop_playing();
        tick_for(&mut state, &mut ed, &mut widgets, 0.2, 0.1);
        assert_eq!(state.counter(), launched_at + 1);

        // Five seconds later nothing re-fires and nothing re-stops.
        ed.play_main_scene(); // a later, unrelated session
        state.observe_playing(true);
        tick_for(&mut state, &mut ed, &mut widgets, 6.0, 0.1);
        assert!(ed.is_playing());
        assert_eq!(state.counter(), launched_at + 1);
    }

    #[test]
    fn auto_stop_stops_the_scene_at_the_deadline() {
        let mut ed = FakeEditor::new();
        ed.play_main_scene();
        let mut widgets = WidgetCache::new();
        let mut state = LaunchState::new();
        state.arm(1, 1, "run_scene", Some(0.5));

        tick_for(&mut state, &mut ed, &mut widgets, 1.0, 0.1);
        assert!(!ed.is_playing());
        // The early stop also swallowed the pending-launch record.
        assert!(!state.has_pending_launch());
    }
}
