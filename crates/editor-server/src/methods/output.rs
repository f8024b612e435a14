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

//! The `get_output` handler: scrape the Output panel's parsed text and apply
//! the mirror's cursor semantics.

use super::{MethodContext, panel_missing, parse_params};
use crate::widgets::EditorWidget;
use gdbridge_protocol::envelope::ErrorObject;
use serde_derive::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
struct OutputParams {
    #[serde(default)]
    clear: bool,
    #[serde(default)]
    new_only: bool,
}

pub fn get_output(cx: &mut MethodContext, params: &str) -> Result<Value, ErrorObject> {
    let params: OutputParams = parse_params(params)?;

    let log = cx
        .state
        .widgets
        .locate(cx.ui, EditorWidget::OutputLog)
        .and_then(|id| cx.ui.parsed_text(id))
        .ok_or_else(|| panel_missing("output panel", "editor log widget unavailable"))?;

    let read = cx.state.output.read(&log, params.new_only, params.clear);
    Ok(json!({
        "output": read.text,
        "length": read.length,
        "total_length": read.total_length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerState;
    use crate::testing::FakeEditor;
    use gdbridge_protocol::envelope::INTERNAL_ERROR;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_log_widget_is_a_server_error() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let mut cx = MethodContext {
            state: &mut state,
            ui: &mut ed,
            request_id: 1,
            client: 1,
        };
        let err = get_output(&mut cx, "null").unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[test]
    fn cursor_semantics_flow_through_the_handler() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        let log = ed.add_widget("RichTextLabel", "/root/EditorNode/EditorLog/Log");
        ed.set_rich_text(log, "hello world");

        let mut cx = MethodContext {
            state: &mut state,
            ui: &mut ed,
            request_id: 1,
            client: 1,
        };
        let result = get_output(&mut cx, r#"{"new_only": true, "clear": true}"#).unwrap();
        assert_eq!(result["output"], "hello world");
        assert_eq!(result["length"], 11);

        ed.set_rich_text(log, "hello world!!!!!");
        let mut cx = MethodContext {
            state: &mut state,
            ui: &mut ed,
            request_id: 2,
            client: 1,
        };
        let result = get_output(&mut cx, r#"{"new_only": true, "clear": true}"#).unwrap();
        assert_eq!(result["output"], "!!!!!");
        assert_eq!(result["length"], 5);
        assert_eq!(result["total_length"], 16);
    }
}
