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

//! The remote scene tree and remote node inspection.
//!
//! Both handlers depend on the editor reacting to something we did a frame
//! earlier — pressing the Remote toggle populates the tree, selecting a tree
//! item populates the inspector — so both speak the pending protocol. The
//! arming action is only performed when the current UI state doesn't already
//! match; a client that polls again before the UI caught up gets another
//! `pending` without a second click.

use super::{MethodContext, panel_missing, parse_params, pending_result};
use crate::widgets::{EditorWidget, linearize_tree};
use gdbridge_protocol::envelope::ErrorObject;
use serde_derive::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Tree population wait hint.
const TREE_RETRY_MS: u64 = 150;
/// Inspector population wait hint.
const INSPECTOR_RETRY_MS: u64 = 300;

pub fn get_remote_scene_tree(cx: &mut MethodContext) -> Result<Value, ErrorObject> {
    if let Some(snapshot) = cx
        .state
        .widgets
        .locate(cx.ui, EditorWidget::RemoteSceneTree)
        .and_then(|id| cx.ui.tree_snapshot(id))
        && !snapshot.children.is_empty()
    {
        return Ok(json!({
            "pending": false,
            "tree": linearize_tree(&snapshot),
        }));
    }

    let toggle = cx
        .state
        .widgets
        .locate(cx.ui, EditorWidget::RemoteToggle)
        .ok_or_else(|| panel_missing("remote scene tree", "is a scene playing?"))?;

    if cx.ui.is_toggled(toggle) != Some(true) {
        debug!("pressing the Remote toggle to populate the scene tree");
        cx.ui.press_button(toggle);
    }
    Ok(pending_result(
        "remote scene tree populating",
        TREE_RETRY_MS,
    ))
}

#[derive(Debug, Default, Deserialize)]
struct NodePropertiesParams {
    #[serde(default)]
    path: Option<String>,
}

pub fn get_remote_node_properties(
    cx: &mut MethodContext,
    params: &str,
) -> Result<Value, ErrorObject> {
    let params: NodePropertiesParams = parse_params(params)?;
    let path = params
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ErrorObject::invalid_params("missing 'path' parameter"))?;

    let components: Vec<String> = path
        .split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if components.is_empty() {
        return Err(ErrorObject::invalid_params(format!(
            "unusable node path: {path}"
        )));
    }

    let tree = cx
        .state
        .widgets
        .locate(cx.ui, EditorWidget::RemoteSceneTree)
        .ok_or_else(|| panel_missing("remote scene tree", "is a scene playing?"))?;

    if cx.ui.selected_tree_path(tree).as_deref() == Some(&components[..]) {
        // Already the inspection target; just sample.
        let inspector = cx
            .state
            .widgets
            .locate(cx.ui, EditorWidget::MainInspector)
            .ok_or_else(|| panel_missing("inspector", "editor inspector unavailable"))?;
        let props = cx.ui.inspector_properties(inspector);
        if props.is_empty() {
            return Ok(pending_result(
                "inspector not yet populated",
                INSPECTOR_RETRY_MS,
            ));
        }
        let mut properties = Map::new();
        for (name, value) in props {
            properties.insert(name, Value::String(value));
        }
        return Ok(json!({
            "pending": false,
            "path": path,
            "properties": properties,
        }));
    }

    if !cx.ui.select_tree_item(tree, &components) {
        return Err(ErrorObject::internal(format!("node not found: {path}")));
    }
    debug!(%path, "remote node selected, inspector populating");
    Ok(pending_result(
        "node selected; inspector populating",
        INSPECTOR_RETRY_MS,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TreeNode;
    use crate::server::ServerState;
    use crate::testing::FakeEditor;
    use gdbridge_protocol::envelope::INTERNAL_ERROR;
    use pretty_assertions::assert_eq;

    fn cx<'a>(state: &'a mut ServerState, ed: &'a mut FakeEditor) -> MethodContext<'a> {
        MethodContext {
            state,
            ui: ed,
            request_id: 1,
            client: 1,
        }
    }

    fn remote_widgets(ed: &mut FakeEditor) -> (u64, u64) {
        let tree = ed.add_widget("Tree", "/root/SceneTreeDock/Remote/Tree");
        let toggle = ed.add_widget("Button", "/root/SceneTreeDock/Remote/Toggle");
        (tree, toggle)
    }

    #[test]
    fn no_remote_widgets_means_no_running_scene() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let err = get_remote_scene_tree(&mut cx(&mut state, &mut ed)).unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[test]
    fn empty_tree_presses_the_toggle_exactly_once() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let (tree, toggle) = remote_widgets(&mut ed);

        let result = get_remote_scene_tree(&mut cx(&mut state, &mut ed)).unwrap();
        assert_eq!(result["pending"], true);
        assert_eq!(ed.button_presses(toggle), 1);

        // Poll again before the tree populated: no second press.
        let result = get_remote_scene_tree(&mut cx(&mut state, &mut ed)).unwrap();
        assert_eq!(result["pending"], true);
        assert_eq!(ed.button_presses(toggle), 1);

        // Tree populates; next call returns data.
        ed.set_tree(
            tree,
            TreeNode::branch(&[], vec![TreeNode::leaf(&["root"])]),
        );
        let result = get_remote_scene_tree(&mut cx(&mut state, &mut ed)).unwrap();
        assert_eq!(result["pending"], false);
        assert_eq!(result["tree"], "root\n");
    }

    #[test]
    fn node_properties_select_then_sample() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let (tree, _) = remote_widgets(&mut ed);
        ed.set_tree(
            tree,
            TreeNode::branch(
                &[],
                vec![TreeNode::branch(
                    &["root"],
                    vec![TreeNode::leaf(&["Player"])],
                )],
            ),
        );
        let inspector = ed.add_widget("EditorInspector", "/root/InspectorDock/Inspector");

        let params = r#"{"path": "/root/Player"}"#;
        let result = get_remote_node_properties(&mut cx(&mut state, &mut ed), params).unwrap();
        assert_eq!(result["pending"], true);

        // Selection matches but the inspector is still empty.
        let result = get_remote_node_properties(&mut cx(&mut state, &mut ed), params).unwrap();
        assert_eq!(result["pending"], true);
        assert_eq!(ed.tree_selections(tree), 1);

        ed.set_inspector_properties(inspector, &[("position", "Vector2(3, 4)")]);
        let result = get_remote_node_properties(&mut cx(&mut state, &mut ed), params).unwrap();
        assert_eq!(result["pending"], false);
        assert_eq!(result["properties"]["position"], "Vector2(3, 4)");
    }

    #[test]
    fn unknown_node_paths_are_reported() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let (tree, _) = remote_widgets(&mut ed);
        ed.set_tree(
            tree,
            TreeNode::branch(&[], vec![TreeNode::leaf(&["root"])]),
        );

        let err = get_remote_node_properties(
            &mut cx(&mut state, &mut ed),
            r#"{"path": "/root/Ghost"}"#,
        )
        .unwrap_err();
        assert!(err.message.contains("/root/Ghost"));
    }
}
