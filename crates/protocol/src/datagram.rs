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

//! The game-helper datagram protocol.
//!
//! While a scene is playing, the game process answers single-datagram
//! requests on a fixed loopback port: one JSON object in, one JSON object
//! out. There is no id — request/response pairing rides on the client's
//! one-off ephemeral source port. Requests are idempotent; clients time out
//! and retry.

use crate::input::InputSpec;
use serde::{Deserialize, Serialize};

/// Fixed loopback port the game helper listens on.
pub const GAME_PORT: u16 = 9123;

/// Default deadline for a datagram round trip.
pub const GAME_DEADLINE_SECS: u64 = 5;

/// One datagram request, selected by `cmd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum GameCommand {
    /// Capture the game viewport to the well-known PNG path.
    Screenshot,
    /// Evaluate an expression in the running game and return its display
    /// form.
    Evaluate { expression: String },
    /// Synthesise an input event through the game's input dispatcher.
    Input {
        #[serde(flatten)]
        event: InputSpec,
    },
}

/// Reply to a `screenshot` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotReply {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Reply to an `evaluate` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateReply {
    pub result: String,
}

/// Reply to an `input` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputReply {
    pub status: String,
}

impl InputReply {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Error reply, the only other shape a datagram response can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatagramError {
    pub error: String,
}

impl DatagramError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn commands_round_trip_with_cmd_tags() {
        let cmd = GameCommand::Evaluate {
            expression: "1 + 2".into(),
        };
        let wire = serde_json::to_string(&cmd).unwrap();
        assert!(wire.contains(r#""cmd":"evaluate""#));
        assert_eq!(serde_json::from_str::<GameCommand>(&wire).unwrap(), cmd);
    }

    #[test]
    fn input_flattens_the_event_fields() {
        let wire = r#"{"cmd": "input", "type": "mouse_button", "button": "left", "x": 10.0, "y": 20.0}"#;
        let cmd: GameCommand = serde_json::from_str(wire).unwrap();
        let GameCommand::Input { event } = cmd else {
            panic!("expected input command");
        };
        assert_eq!(
            event,
            InputSpec::MouseButton {
                button: "left".into(),
                pressed: true,
                x: 10.0,
                y: 20.0
            }
        );
    }

    #[test]
    fn screenshot_has_no_params() {
        let cmd: GameCommand = serde_json::from_str(r#"{"cmd": "screenshot"}"#).unwrap();
        assert_eq!(cmd, GameCommand::Screenshot);
    }
}
