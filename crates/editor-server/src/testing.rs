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

//! In-memory editor double for tests.
//!
//! [`FakeEditor`] implements the scraped-editor traits over a flat widget
//! table the test can mutate between calls: populate a tree here, kill a
//! widget there, and watch the handlers cope the way they must against the
//! real editor. It also records every action the server takes (buttons
//! pressed, frames selected, scenes played) so tests can assert on arming
//! behaviour, not just results.

use crate::editor::{
    DebuggerSession, EditorUi, StepMode, TreeNode, ViewportCapture, WidgetId,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

#[derive(Debug, Default)]
struct FakeWidget {
    class: String,
    path: String,
    alive: bool,
    rich_text: Option<String>,
    label: Option<String>,
    tree: Option<TreeNode>,
    toggled: Option<bool>,
    presses: usize,
    selected_path: Option<Vec<String>>,
    tree_selections: usize,
    selected_frame: Option<usize>,
    inspector_props: Vec<(String, String)>,
}

/// Scripted debugger session.
#[derive(Debug, Default)]
pub struct FakeDebugger {
    pub active: bool,
    pub paused: bool,
    pub debuggable: bool,
    pub steps: Vec<StepMode>,
    pub resumes: usize,
    pub breaks: usize,
    breakpoints: BTreeMap<(String, u32), bool>,
}

impl DebuggerSession for FakeDebugger {
    fn is_active(&self) -> bool {
        self.active
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_debuggable(&self) -> bool {
        self.debuggable
    }

    fn resume(&mut self) {
        self.resumes += 1;
        self.paused = false;
    }

    fn step(&mut self, mode: StepMode) {
        self.steps.push(mode);
    }

    fn request_break(&mut self) {
        self.breaks += 1;
        self.paused = true;
    }

    fn set_breakpoint(&mut self, script: &str, line: u32, enabled: bool) {
        self.breakpoints.insert((script.to_string(), line), enabled);
    }

    fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }
}

pub struct FakeEditor {
    widgets: HashMap<WidgetId, FakeWidget>,
    next_id: WidgetId,
    root: WidgetId,
    version_major: u32,
    playing: bool,
    played: Vec<String>,
    stops: usize,
    debugger_present: bool,
    debugger: FakeDebugger,
    script_breakpoints: BTreeMap<(String, u32), bool>,
    viewports: Vec<ViewportCapture>,
}

impl Default for FakeEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEditor {
    pub fn new() -> Self {
        let mut widgets = HashMap::new();
        widgets.insert(
            1,
            FakeWidget {
                class: "Control".to_string(),
                path: "/root".to_string(),
                alive: true,
                ..Default::default()
            },
        );
        Self {
            widgets,
            next_id: 2,
            root: 1,
            version_major: 4,
            playing: false,
            played: Vec::new(),
            stops: 0,
            debugger_present: false,
            debugger: FakeDebugger::default(),
            script_breakpoints: BTreeMap::new(),
            viewports: Vec::new(),
        }
    }

    pub fn add_widget(&mut self, class: &str, path: &str) -> WidgetId {
        let id = self.next_id;
        self.next_id += 1;
        self.widgets.insert(
            id,
            FakeWidget {
                class: class.to_string(),
                path: path.to_string(),
                alive: true,
                ..Default::default()
            },
        );
        id
    }

    /// Destroy a widget the way the editor does across play cycles: the
    /// handle stays known but everything about it reads as dead.
    pub fn kill_widget(&mut self, id: WidgetId) {
        if let Some(w) = self.widgets.get_mut(&id) {
            w.alive = false;
        }
    }

    pub fn set_version_major(&mut self, version: u32) {
        self.version_major = version;
    }

    pub fn set_rich_text(&mut self, id: WidgetId, text: &str) {
        if let Some(w) = self.widgets.get_mut(&id) {
            w.rich_text = Some(text.to_string());
        }
    }

    pub fn set_label_text(&mut self, id: WidgetId, text: &str) {
        if let Some(w) = self.widgets.get_mut(&id) {
            w.label = Some(text.to_string());
        }
    }

    pub fn set_tree(&mut self, id: WidgetId, tree: TreeNode) {
        if let Some(w) = self.widgets.get_mut(&id) {
            w.tree = Some(tree);
        }
    }

    pub fn set_inspector_properties(&mut self, id: WidgetId, props: &[(&str, &str)]) {
        if let Some(w) = self.widgets.get_mut(&id) {
            w.inspector_props = props
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect();
        }
    }

    pub fn set_viewports(&mut self, viewports: Vec<ViewportCapture>) {
        self.viewports = viewports;
    }

    pub fn set_debugger_active(&mut self, active: bool) {
        self.debugger_present = active;
        self.debugger.active = active;
        self.debugger.debuggable = active;
    }

    pub fn debugger_mut(&mut self) -> &mut FakeDebugger {
        &mut self.debugger
    }

    pub fn button_presses(&self, id: WidgetId) -> usize {
        self.widgets.get(&id).map(|w| w.presses).unwrap_or(0)
    }

    pub fn tree_selections(&self, id: WidgetId) -> usize {
        self.widgets.get(&id).map(|w| w.tree_selections).unwrap_or(0)
    }

    pub fn frame_selections(&self) -> usize {
        self.widgets
            .values()
            .map(|w| w.tree_selections)
            .sum()
    }

    pub fn played_scenes(&self) -> Vec<String> {
        self.played.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops
    }

    pub fn debugger_steps(&self) -> Vec<StepMode> {
        self.debugger.steps.clone()
    }

    pub fn script_breakpoints(&self) -> Vec<(String, u32, bool)> {
        self.script_breakpoints
            .iter()
            .map(|((p, l), e)| (p.clone(), *l, *e))
            .collect()
    }

    pub fn session_breakpoints(&self) -> Vec<(String, u32, bool)> {
        self.debugger
            .breakpoints
            .iter()
            .map(|((p, l), e)| (p.clone(), *l, *e))
            .collect()
    }

    fn widget(&self, id: WidgetId) -> Option<&FakeWidget> {
        self.widgets.get(&id).filter(|w| w.alive)
    }

    fn tree_contains(node: &TreeNode, path: &[String]) -> bool {
        let Some((head, rest)) = path.split_first() else {
            return true;
        };
        node.children
            .iter()
            .filter(|c| c.columns.first() == Some(head))
            .any(|c| Self::tree_contains(c, rest))
    }
}

impl EditorUi for FakeEditor {
    fn project_dir(&self) -> PathBuf {
        PathBuf::from("/home/user/projects/Fake Game")
    }

    fn version_major(&self) -> u32 {
        self.version_major
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play_main_scene(&mut self) {
        self.playing = true;
        self.played.push("<main>".to_string());
    }

    fn play_scene(&mut self, path: &str) {
        self.playing = true;
        self.played.push(path.to_string());
    }

    fn play_current_scene(&mut self) {
        self.playing = true;
        self.played.push("<current>".to_string());
    }

    fn stop_playing(&mut self) {
        if self.playing {
            self.stops += 1;
        }
        self.playing = false;
    }

    fn root_widget(&self) -> WidgetId {
        self.root
    }

    fn children(&self, id: WidgetId) -> Vec<WidgetId> {
        if id != self.root {
            return Vec::new();
        }
        let mut ids: Vec<WidgetId> = self
            .widgets
            .keys()
            .copied()
            .filter(|k| *k != self.root)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn class_name(&self, id: WidgetId) -> Option<String> {
        self.widget(id).map(|w| w.class.clone())
    }

    fn widget_path(&self, id: WidgetId) -> Option<String> {
        self.widget(id).map(|w| w.path.clone())
    }

    fn is_alive(&self, id: WidgetId) -> bool {
        self.widget(id).is_some()
    }

    fn parsed_text(&self, id: WidgetId) -> Option<String> {
        self.widget(id).and_then(|w| w.rich_text.clone())
    }

    fn label_text(&self, id: WidgetId) -> Option<String> {
        self.widget(id).and_then(|w| w.label.clone())
    }

    fn tree_snapshot(&self, id: WidgetId) -> Option<TreeNode> {
        self.widget(id).and_then(|w| w.tree.clone())
    }

    fn is_toggled(&self, id: WidgetId) -> Option<bool> {
        self.widget(id).and_then(|w| w.toggled)
    }

    fn press_button(&mut self, id: WidgetId) -> bool {
        let Some(w) = self.widgets.get_mut(&id).filter(|w| w.alive) else {
            return false;
        };
        w.presses += 1;
        w.toggled = Some(true);
        true
    }

    fn select_tree_item(&mut self, id: WidgetId, path: &[String]) -> bool {
        let found = self
            .widget(id)
            .and_then(|w| w.tree.as_ref())
            .is_some_and(|tree| Self::tree_contains(tree, path));
        if !found {
            return false;
        }
        let w = self.widgets.get_mut(&id).expect("widget just read");
        w.selected_path = Some(path.to_vec());
        w.tree_selections += 1;
        true
    }

    fn selected_tree_path(&self, id: WidgetId) -> Option<Vec<String>> {
        self.widget(id).and_then(|w| w.selected_path.clone())
    }

    fn select_stack_frame(&mut self, id: WidgetId, index: usize) -> bool {
        let frames = self
            .widget(id)
            .and_then(|w| w.tree.as_ref())
            .map(|t| t.children.len())
            .unwrap_or(0);
        if index >= frames {
            return false;
        }
        let w = self.widgets.get_mut(&id).expect("widget just read");
        w.selected_frame = Some(index);
        w.tree_selections += 1;
        true
    }

    fn selected_stack_frame(&self, id: WidgetId) -> Option<usize> {
        self.widget(id).and_then(|w| w.selected_frame)
    }

    fn inspector_properties(&self, id: WidgetId) -> Vec<(String, String)> {
        self.widget(id)
            .map(|w| w.inspector_props.clone())
            .unwrap_or_default()
    }

    fn set_script_breakpoint(&mut self, script: &str, line: u32, enabled: bool) {
        self.script_breakpoints
            .insert((script.to_string(), line), enabled);
    }

    fn clear_script_breakpoints(&mut self) {
        self.script_breakpoints.clear();
    }

    fn debugger(&mut self) -> Option<&mut dyn DebuggerSession> {
        if self.debugger_present {
            Some(&mut self.debugger)
        } else {
            None
        }
    }

    fn capture_viewports(&mut self) -> Vec<ViewportCapture> {
        self.viewports.clone()
    }
}
