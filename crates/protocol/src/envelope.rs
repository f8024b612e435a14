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

//! Request, reply, and notification envelopes for the adapter ↔ editor
//! stream protocol.
//!
//! Each direction of the stream carries newline-terminated UTF-8 JSON
//! objects. A frame with an `id` is a request (client → server) or a reply
//! (server → client); a reply-shaped frame without an `id` is a
//! notification. The only defined notification carries a captured output
//! record; unknown notifications must be dropped silently by receivers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Invalid JSON on the wire.
pub const PARSE_ERROR: i64 = -32700;
/// Structurally broken envelope: bad id, missing or non-string method.
pub const INVALID_REQUEST: i64 = -32600;
/// Method name not in the dispatch table.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Missing or ill-typed method parameter.
pub const INVALID_PARAMS: i64 = -32602;
/// Any server-side failure with no more specific code.
pub const INTERNAL_ERROR: i64 = -32000;

/// A request frame: client-assigned id, method name, optional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Parse one wire line into a request, reporting failures as the error
    /// object the caller should send back.
    ///
    /// Ids are accepted as non-negative integers or as floats with integral
    /// value (some JSON producers emit `1.0` for `1`); anything else is an
    /// invalid envelope.
    pub fn parse(line: &str) -> Result<Self, ErrorObject> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| ErrorObject::new(PARSE_ERROR, format!("parse error: {e}")))?;

        let id = normalize_id(value.get("id"))
            .ok_or_else(|| ErrorObject::new(INVALID_REQUEST, "invalid request: bad or missing id"))?;

        let method = match value.get("method").and_then(Value::as_str) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => {
                return Err(ErrorObject::new(
                    INVALID_REQUEST,
                    "invalid request: missing method",
                ));
            }
        };

        Ok(Self {
            id,
            method,
            params: value.get("params").cloned(),
        })
    }
}

/// Normalise a wire id to an integer. Integral floats are accepted and
/// truncated; negative and fractional values are rejected.
pub fn normalize_id(id: Option<&Value>) -> Option<u64> {
    match id? {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if let Some(f) = n.as_f64() {
                (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Error object carried inside a reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("unknown method: {method}"))
    }
}

/// A reply frame. Exactly one of `result` / `error` is populated; the id is
/// the one from the request being answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Reply {
    pub fn result(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, error: ErrorObject) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the result carries the deferred-completion `pending` flag.
    pub fn is_pending(&self) -> bool {
        self.result
            .as_ref()
            .and_then(|r| r.get("pending"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Category of a captured editor output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Print,
    Warning,
    Error,
    Stack,
}

/// One captured output record, the payload of the `output` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub kind: OutputKind,
    pub message: String,
    /// Seconds since the Unix epoch at capture time.
    pub timestamp: f64,
}

/// Anything that can arrive on the adapter's read side of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Reply(Reply),
    /// An id-less frame carrying a recognised notification payload.
    Output(OutputRecord),
    /// An id-less frame we don't recognise. Receivers drop these silently.
    UnknownNotification,
}

impl Frame {
    /// Classify one incoming wire line.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("id").is_some() {
            return Ok(Frame::Reply(serde_json::from_value(value)?));
        }
        let Some(result) = value.get("result") else {
            return Ok(Frame::UnknownNotification);
        };
        if result.get("type").and_then(Value::as_str) == Some("output")
            && let Ok(record) = serde_json::from_value::<OutputRecord>(result.clone())
        {
            return Ok(Frame::Output(record));
        }
        Ok(Frame::UnknownNotification)
    }

    /// Serialise an output record as the id-less notification frame.
    pub fn output_notification(record: &OutputRecord) -> Value {
        let mut result = serde_json::to_value(record).expect("output record serializes");
        result["type"] = Value::String("output".to_string());
        serde_json::json!({ "result": result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_round_trip() {
        let req = Request::new(7, "get_output", Some(json!({"clear": true})));
        let line = serde_json::to_string(&req).unwrap();
        let back = Request::parse(&line).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn reply_round_trip_preserves_bodies() {
        let ok = Reply::result(3, json!({"status": "ok"}));
        let back: Reply = serde_json::from_str(&serde_json::to_string(&ok).unwrap()).unwrap();
        assert_eq!(ok, back);

        let err = Reply::error(4, ErrorObject::internal("no editor"));
        let back: Reply = serde_json::from_str(&serde_json::to_string(&err).unwrap()).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn float_ids_normalize_when_integral() {
        let req = Request::parse(r#"{"id": 12.0, "method": "ping"}"#).unwrap();
        assert_eq!(req.id, 12);

        let err = Request::parse(r#"{"id": 12.5, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);

        let err = Request::parse(r#"{"id": -1, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = Request::parse("{not json").unwrap_err();
        assert_eq!(err.code, PARSE_ERROR);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        let err = Request::parse(r#"{"id": 1}"#).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
        let err = Request::parse(r#"{"id": 1, "method": 9}"#).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn frames_classify_by_id_presence() {
        let frame = Frame::parse(r#"{"id": 1, "result": {"status": "ok"}}"#).unwrap();
        assert!(matches!(frame, Frame::Reply(_)));

        let record = OutputRecord {
            kind: OutputKind::Warning,
            message: "careful".into(),
            timestamp: 12.5,
        };
        let wire = serde_json::to_string(&Frame::output_notification(&record)).unwrap();
        let frame = Frame::parse(&wire).unwrap();
        assert_eq!(frame, Frame::Output(record));
    }

    #[test]
    fn unknown_notifications_are_marked_for_dropping() {
        let frame = Frame::parse(r#"{"result": {"type": "telemetry", "x": 1}}"#).unwrap();
        assert_eq!(frame, Frame::UnknownNotification);
        let frame = Frame::parse(r#"{"something": "else"}"#).unwrap();
        assert_eq!(frame, Frame::UnknownNotification);
    }

    #[test]
    fn pending_flag_is_visible_on_replies() {
        let reply = Reply::result(1, json!({"pending": true, "message": "wait"}));
        assert!(reply.is_pending());
        let reply = Reply::result(1, json!({"status": "ok"}));
        assert!(!reply.is_pending());
    }
}
