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

//! The scraped-editor surface.
//!
//! The editor exposes no stable API for its internal widgets, so the server
//! drives it through this pair of traits instead of concrete types. The
//! GDExtension embedding implements them against the live editor: widget
//! handles are the editor's own instance ids, and every accessor returns
//! `None`/`false` for a handle whose object has since been destroyed — the
//! editor recreates debugger panels across play cycles, so stale handles
//! are a routine condition callers must expect, not an edge case.
//!
//! Contract notes the handlers rely on:
//!
//! - `play_*` / `stop_playing` take effect synchronously as far as
//!   [`EditorUi::is_playing`] is concerned.
//! - `select_tree_item` emits whichever selection signal the editor version
//!   in use wants (the signal names differ between major versions), so the
//!   inspector starts populating as a side effect.
//! - `capture_viewports` synchronises with end-of-frame rendering before
//!   sampling pixels. It is the one place a short in-frame wait is allowed.

use std::path::PathBuf;

/// Opaque handle to a live editor widget (the editor's instance id).
pub type WidgetId = u64;

/// Debugger stepping granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Into,
    Over,
    Out,
}

impl StepMode {
    /// Parse the wire name, `into` / `over` / `out`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "into" => Some(StepMode::Into),
            "over" => Some(StepMode::Over),
            "out" => Some(StepMode::Out),
            _ => None,
        }
    }
}

/// A snapshot of a `Tree` widget's item model: one node's column texts and
/// its children, recursively. The root node of a snapshot is the tree's
/// (often hidden) root item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeNode {
    pub columns: Vec<String>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            children: Vec::new(),
        }
    }

    pub fn branch(columns: &[&str], children: Vec<TreeNode>) -> Self {
        Self {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            children,
        }
    }
}

/// Raw RGBA pixels sampled from one editor viewport.
#[derive(Debug, Clone)]
pub struct ViewportCapture {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major RGBA.
    pub rgba: Vec<u8>,
}

/// The live debugger session, present only while a debuggable scene runs.
pub trait DebuggerSession {
    fn is_active(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_debuggable(&self) -> bool;

    fn resume(&mut self);
    fn step(&mut self, mode: StepMode);
    fn request_break(&mut self);

    /// Arm or disarm a breakpoint in the session. This alone does not arm
    /// the script-editor widget; callers dual-write via
    /// [`EditorUi::set_script_breakpoint`].
    fn set_breakpoint(&mut self, script: &str, line: u32, enabled: bool);
    fn clear_breakpoints(&mut self);
}

/// Everything the server scrapes or drives in the editor process.
pub trait EditorUi {
    // Identity and playback control.
    fn project_dir(&self) -> PathBuf;
    /// Major editor version; selects widget path patterns.
    fn version_major(&self) -> u32;
    fn is_playing(&self) -> bool;
    fn play_main_scene(&mut self);
    fn play_scene(&mut self, path: &str);
    fn play_current_scene(&mut self);
    fn stop_playing(&mut self);

    // Widget tree reflection.
    fn root_widget(&self) -> WidgetId;
    fn children(&self, id: WidgetId) -> Vec<WidgetId>;
    fn class_name(&self, id: WidgetId) -> Option<String>;
    fn widget_path(&self, id: WidgetId) -> Option<String>;
    fn is_alive(&self, id: WidgetId) -> bool;

    // Per-kind accessors. `None` for a dead handle or the wrong widget kind.
    /// Parsed (markup-stripped) text of a rich-text log widget.
    fn parsed_text(&self, id: WidgetId) -> Option<String>;
    fn label_text(&self, id: WidgetId) -> Option<String>;
    fn tree_snapshot(&self, id: WidgetId) -> Option<TreeNode>;
    /// Pressed state of a toggle button.
    fn is_toggled(&self, id: WidgetId) -> Option<bool>;
    fn press_button(&mut self, id: WidgetId) -> bool;

    /// Select the tree item addressed by `path` components under the root
    /// item, emitting the version-appropriate selection signal. Returns
    /// false when no such item exists.
    fn select_tree_item(&mut self, id: WidgetId, path: &[String]) -> bool;
    fn selected_tree_path(&self, id: WidgetId) -> Option<Vec<String>>;

    /// Select stack frame `index` in the frames tree, driving the debugger
    /// to publish that frame's locals.
    fn select_stack_frame(&mut self, id: WidgetId, index: usize) -> bool;
    fn selected_stack_frame(&self, id: WidgetId) -> Option<usize>;

    /// Name/value pairs currently shown by an inspector widget. Empty while
    /// the inspector is still populating.
    fn inspector_properties(&self, id: WidgetId) -> Vec<(String, String)>;

    // Script editor breakpoint gutter (widget side of the dual write;
    // `line` here is the widget's 0-indexed line).
    fn set_script_breakpoint(&mut self, script: &str, line: u32, enabled: bool);
    fn clear_script_breakpoints(&mut self);

    fn debugger(&mut self) -> Option<&mut dyn DebuggerSession>;

    /// Sample every editor viewport after end-of-frame rendering.
    fn capture_viewports(&mut self) -> Vec<ViewportCapture>;
}
