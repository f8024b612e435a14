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

//! The editor server proper: per-frame orchestration of transport, router,
//! and launch bookkeeping.
//!
//! Within one tick the server observes play/stop transitions, drains the
//! accept backlog, reads every client once, dispatches every complete
//! request and writes its reply inline, then runs the launch machinery
//! (auto-stop countdown, startup-fault detector) and flushes any queued
//! output notifications. Nothing here blocks; the editor's frame budget is
//! sacred.

use crate::editor::EditorUi;
use crate::launch::LaunchState;
use crate::output::OutputMirror;
use crate::router;
use crate::transport::StreamServer;
use crate::widgets::WidgetCache;
use crate::ServerError;
use gdbridge_protocol::envelope::{Frame, OutputKind, OutputRecord};
use gdbridge_protocol::overrides::OVERRIDES_PATH;
use gdbridge_protocol::socket_path::socket_path;
use gdbridge_protocol::EDITOR_SCREENSHOT_PATH;
use std::collections::VecDeque;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The canonical breakpoint set. Duplicates by (path, line) overwrite; the
/// set survives play cycles so breakpoints can be re-pushed to fresh
/// debugger sessions.
#[derive(Debug, Default)]
pub struct BreakpointSet {
    map: BTreeMap<(String, u32), bool>,
}

impl BreakpointSet {
    pub fn set(&mut self, path: &str, line: u32, enabled: bool) {
        self.map.insert((path.to_string(), line), enabled);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32, bool)> {
        self.map
            .iter()
            .map(|((path, line), enabled)| (path.as_str(), *line, *enabled))
    }
}

/// Mutable server state shared by every handler.
pub struct ServerState {
    pub output: OutputMirror,
    pub launch: LaunchState,
    pub widgets: WidgetCache,
    pub breakpoints: BreakpointSet,
    pub overrides_path: PathBuf,
    pub screenshot_path: PathBuf,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            output: OutputMirror::new(),
            launch: LaunchState::new(),
            widgets: WidgetCache::new(),
            breakpoints: BreakpointSet::default(),
            overrides_path: PathBuf::from(OVERRIDES_PATH),
            screenshot_path: PathBuf::from(EDITOR_SCREENSHOT_PATH),
        }
    }

    /// State with scratch side-file paths, so tests never touch the real
    /// well-known files.
    pub fn for_tests() -> Self {
        let scratch = std::env::temp_dir().join(format!("gdbridge-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&scratch);
        let mut state = Self::new();
        state.overrides_path = scratch.join("overrides.json");
        state.screenshot_path = scratch.join("editor.png");
        state
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EditorServer {
    transport: StreamServer,
    state: ServerState,
    notifications: VecDeque<OutputRecord>,
}

impl EditorServer {
    /// Bind the project-scoped socket for `project_dir` (honoring the
    /// environment override) and return the running server.
    pub fn bind(project_dir: &Path) -> Result<Self, ServerError> {
        Self::bind_at(&socket_path(project_dir))
    }

    /// Bind an explicit socket path.
    pub fn bind_at(path: &Path) -> Result<Self, ServerError> {
        Ok(Self {
            transport: StreamServer::bind(path)?,
            state: ServerState::new(),
            notifications: VecDeque::new(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.transport.path()
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ServerState {
        &mut self.state
    }

    pub fn client_count(&self) -> usize {
        self.transport.client_count()
    }

    /// Queue a captured output record for broadcast on the next tick. The
    /// embedding calls this from its editor-log capture hook.
    pub fn push_output(&mut self, kind: OutputKind, message: impl Into<String>) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.notifications.push_back(OutputRecord {
            kind,
            message: message.into(),
            timestamp,
        });
    }

    /// One frame's worth of work. Called by the embedding every editor
    /// frame with the scraped-editor surface and the frame delta in
    /// seconds.
    pub fn tick(&mut self, ui: &mut dyn EditorUi, delta: f32) {
        self.state.launch.observe_playing(ui.is_playing());

        self.transport.accept_new();

        for (client, line) in self.transport.read_frames() {
            let reply = router::handle_line(&line, &mut self.state, ui, client);
            let frame = serde_json::to_string(&reply).expect("reply serializes");
            self.transport.send(client, &frame);
        }

        let ServerState {
            launch, widgets, ..
        } = &mut self.state;
        if let Some((client, reply)) = launch.tick(delta, ui, widgets) {
            let frame = serde_json::to_string(&reply).expect("reply serializes");
            self.transport.send(client, &frame);
        }

        while let Some(record) = self.notifications.pop_front() {
            let frame = serde_json::to_string(&Frame::output_notification(&record))
                .expect("notification serializes");
            self.transport.broadcast(&frame);
        }
    }
}
