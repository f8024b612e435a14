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

//! Request routing: one wire line in, one reply envelope out.
//!
//! The router owns envelope-level concerns only — JSON validity, id
//! normalisation, method lookup. Parameters are re-serialised to a bare JSON
//! string and each handler parses what it needs, which keeps this layer
//! independent of every method's parameter schema.

use crate::editor::EditorUi;
use crate::methods::{self, MethodContext};
use crate::server::ServerState;
use crate::transport::ClientKey;
use gdbridge_protocol::envelope::{
    ErrorObject, INVALID_REQUEST, PARSE_ERROR, Reply, normalize_id,
};
use serde_json::Value;
use tracing::debug;

/// Handle one frame from a client. Always produces exactly one reply; when
/// the envelope itself is broken the reply's id is 0 (the real id, if any,
/// was unrecoverable).
pub fn handle_line(
    line: &str,
    state: &mut ServerState,
    ui: &mut dyn EditorUi,
    client: ClientKey,
) -> Reply {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Reply::error(0, ErrorObject::new(PARSE_ERROR, format!("parse error: {e}")));
        }
    };

    let Some(id) = normalize_id(value.get("id")) else {
        return Reply::error(
            0,
            ErrorObject::new(INVALID_REQUEST, "invalid request: bad or missing id"),
        );
    };

    let Some(method) = value.get("method").and_then(Value::as_str) else {
        return Reply::error(
            id,
            ErrorObject::new(INVALID_REQUEST, "invalid request: missing method"),
        );
    };

    let params = value
        .get("params")
        .map(|p| p.to_string())
        .unwrap_or_else(|| "null".to_string());

    debug!(id, method, "dispatching request");

    let mut cx = MethodContext {
        state,
        ui,
        request_id: id,
        client,
    };
    match methods::dispatch(method, &params, &mut cx) {
        Ok(result) => Reply::result(id, result),
        Err(error) => Reply::error(id, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerState;
    use crate::testing::FakeEditor;
    use gdbridge_protocol::envelope::METHOD_NOT_FOUND;
    use pretty_assertions::assert_eq;

    fn route(line: &str) -> Reply {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        handle_line(line, &mut state, &mut ed, 1)
    }

    #[test]
    fn ping_gets_a_trivial_success() {
        let reply = route(r#"{"id": 1, "method": "ping"}"#);
        assert_eq!(reply.id, 1);
        assert_eq!(reply.result.unwrap()["status"], "ok");
    }

    #[test]
    fn float_ids_round_trip_as_integers() {
        let reply = route(r#"{"id": 5.0, "method": "ping"}"#);
        assert_eq!(reply.id, 5);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let reply = route("{nope");
        assert_eq!(reply.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn missing_method_is_an_invalid_request() {
        let reply = route(r#"{"id": 2}"#);
        assert_eq!(reply.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn unknown_methods_are_reported_without_killing_the_connection() {
        let reply = route(r#"{"id": 3, "method": "summon_demons"}"#);
        let err = reply.error.unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("summon_demons"));
    }
}
