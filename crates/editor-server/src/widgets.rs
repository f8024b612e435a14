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

//! Widget location and the liveness-checked cache.
//!
//! Handlers never hold widget references across frames themselves; they ask
//! this cache, which walks the editor's live widget tree looking for a node
//! whose runtime class matches and whose path contains every fragment of a
//! hand-maintained, version-specific selector. Hits are cached, but a cached
//! handle is only ever returned after re-verifying the underlying object is
//! still alive and still matches — the editor tears down and rebuilds the
//! debugger panels on every play cycle.
//!
//! The remote scene tree and the Remote toggle are never cached at all; they
//! come and go with the game process.

use crate::editor::{EditorUi, WidgetId};
use std::collections::HashMap;
use tracing::debug;

/// The widgets the method handlers scrape or drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorWidget {
    /// The Output panel's rich-text log.
    OutputLog,
    /// The debugger's Errors tab tree.
    ErrorsTree,
    /// The label above the stack frames ("Stack Trace" header / error line).
    StackTraceLabel,
    /// The stack frames tree.
    StackFramesTree,
    /// The performance Monitors tree.
    MonitorsTree,
    /// The debugger's own inspector (locals display).
    DebuggerInspector,
    /// The main editor inspector (remote node properties land here).
    MainInspector,
    /// The remote scene tree shown while a scene plays. Never cached.
    RemoteSceneTree,
    /// The Remote/Local toggle above the scene tree dock. Never cached.
    RemoteToggle,
}

struct Selector {
    class: &'static str,
    /// Every fragment must appear in the widget's path.
    fragments: &'static [&'static str],
}

// Path fragments differ between major editor versions: the 4.x debugger
// lives under EditorDebuggerNode, the 3.x one under ScriptEditorDebugger.
fn selector(widget: EditorWidget, version_major: u32) -> Selector {
    let v4 = version_major >= 4;
    match widget {
        EditorWidget::OutputLog => Selector {
            class: "RichTextLabel",
            fragments: &["EditorLog"],
        },
        EditorWidget::ErrorsTree => Selector {
            class: "Tree",
            fragments: if v4 {
                &["EditorDebuggerNode", "Errors"]
            } else {
                &["ScriptEditorDebugger", "Errors"]
            },
        },
        EditorWidget::StackTraceLabel => Selector {
            class: "Label",
            fragments: if v4 {
                &["EditorDebuggerNode", "Stack"]
            } else {
                &["ScriptEditorDebugger", "Stack"]
            },
        },
        EditorWidget::StackFramesTree => Selector {
            class: "Tree",
            fragments: if v4 {
                &["EditorDebuggerNode", "Stack"]
            } else {
                &["ScriptEditorDebugger", "Stack"]
            },
        },
        EditorWidget::MonitorsTree => Selector {
            class: "Tree",
            fragments: if v4 {
                &["EditorDebuggerNode", "Monitors"]
            } else {
                &["ScriptEditorDebugger", "Monitors"]
            },
        },
        EditorWidget::DebuggerInspector => Selector {
            class: "EditorDebuggerInspector",
            fragments: if v4 {
                &["EditorDebuggerNode"]
            } else {
                &["ScriptEditorDebugger"]
            },
        },
        EditorWidget::MainInspector => Selector {
            class: "EditorInspector",
            fragments: &["InspectorDock"],
        },
        EditorWidget::RemoteSceneTree => Selector {
            class: "Tree",
            fragments: &["SceneTreeDock", "Remote"],
        },
        EditorWidget::RemoteToggle => Selector {
            class: "Button",
            fragments: &["SceneTreeDock", "Remote"],
        },
    }
}

fn cacheable(widget: EditorWidget) -> bool {
    !matches!(
        widget,
        EditorWidget::RemoteSceneTree | EditorWidget::RemoteToggle
    )
}

/// Liveness-validated widget handle cache.
#[derive(Default)]
pub struct WidgetCache {
    cached: HashMap<EditorWidget, WidgetId>,
}

impl WidgetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find `widget`, from cache when the cached handle is still alive and
    /// still matches its selector, otherwise by a fresh tree walk.
    pub fn locate(&mut self, ui: &dyn EditorUi, widget: EditorWidget) -> Option<WidgetId> {
        let sel = selector(widget, ui.version_major());

        if let Some(&id) = self.cached.get(&widget) {
            if ui.is_alive(id) && matches(ui, id, &sel) {
                return Some(id);
            }
            debug!(?widget, id, "cached widget handle went stale, re-searching");
            self.cached.remove(&widget);
        }

        let found = search(ui, &sel)?;
        if cacheable(widget) {
            self.cached.insert(widget, found);
        }
        Some(found)
    }

    /// Drop every cached handle. Called when the editor rebuilds large
    /// subtrees (play/stop transitions).
    pub fn invalidate(&mut self) {
        self.cached.clear();
    }
}

fn matches(ui: &dyn EditorUi, id: WidgetId, sel: &Selector) -> bool {
    let Some(class) = ui.class_name(id) else {
        return false;
    };
    let Some(path) = ui.widget_path(id) else {
        return false;
    };
    class == sel.class && sel.fragments.iter().all(|f| path.contains(f))
}

fn search(ui: &dyn EditorUi, sel: &Selector) -> Option<WidgetId> {
    let mut queue = vec![ui.root_widget()];
    while let Some(id) = queue.pop() {
        if matches(ui, id, sel) {
            return Some(id);
        }
        queue.extend(ui.children(id));
    }
    None
}

/// Linearise a tree snapshot into indented text, two spaces per depth. The
/// snapshot root itself is not printed; it is the widget's hidden root item.
pub fn linearize_tree(root: &crate::editor::TreeNode) -> String {
    fn walk(node: &crate::editor::TreeNode, depth: usize, out: &mut String) {
        let text = node.columns.join(": ");
        if !text.is_empty() {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&text);
            out.push('\n');
        }
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    for child in &root.children {
        walk(child, 0, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TreeNode;
    use crate::testing::FakeEditor;
    use pretty_assertions::assert_eq;

    #[test]
    fn locates_by_class_and_path_fragments() {
        let mut ed = FakeEditor::new();
        let log = ed.add_widget("RichTextLabel", "/root/EditorNode/EditorLog/Log");
        ed.add_widget("RichTextLabel", "/root/EditorNode/Docs/Help");

        let mut cache = WidgetCache::new();
        assert_eq!(cache.locate(&ed, EditorWidget::OutputLog), Some(log));
    }

    #[test]
    fn stale_cache_entries_trigger_a_fresh_search() {
        let mut ed = FakeEditor::new();
        let old = ed.add_widget("Tree", "/root/EditorDebuggerNode/Errors/Tree");

        let mut cache = WidgetCache::new();
        assert_eq!(cache.locate(&ed, EditorWidget::ErrorsTree), Some(old));

        // The debugger panel is rebuilt across a play cycle.
        ed.kill_widget(old);
        let fresh = ed.add_widget("Tree", "/root/EditorDebuggerNode/Errors/Tree");
        assert_eq!(cache.locate(&ed, EditorWidget::ErrorsTree), Some(fresh));
    }

    #[test]
    fn remote_widgets_are_never_cached() {
        let mut ed = FakeEditor::new();
        let first = ed.add_widget("Tree", "/root/SceneTreeDock/Remote/Tree");

        let mut cache = WidgetCache::new();
        assert_eq!(cache.locate(&ed, EditorWidget::RemoteSceneTree), Some(first));

        ed.kill_widget(first);
        let second = ed.add_widget("Tree", "/root/SceneTreeDock/Remote/Tree");
        // A cached handle would now be stale; the uncached path finds the
        // replacement immediately.
        assert_eq!(
            cache.locate(&ed, EditorWidget::RemoteSceneTree),
            Some(second)
        );
    }

    #[test]
    fn version_selects_debugger_fragments() {
        let mut ed = FakeEditor::new();
        ed.set_version_major(3);
        let v3 = ed.add_widget("Tree", "/root/ScriptEditorDebugger/Errors/Tree");
        ed.add_widget("Tree", "/root/EditorDebuggerNode/Errors/Tree");

        let mut cache = WidgetCache::new();
        assert_eq!(cache.locate(&ed, EditorWidget::ErrorsTree), Some(v3));
    }

    #[test]
    fn linearizes_with_indentation() {
        let tree = TreeNode::branch(
            &[],
            vec![TreeNode::branch(
                &["Time"],
                vec![
                    TreeNode::leaf(&["FPS", "60"]),
                    TreeNode::leaf(&["Frame Time", "16.6"]),
                ],
            )],
        );
        assert_eq!(
            linearize_tree(&tree),
            "Time\n  FPS: 60\n  Frame Time: 16.6\n"
        );
    }
}
