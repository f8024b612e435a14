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

//! Synthetic input payloads and their name-mapping tables.
//!
//! The `input` datagram command carries one of four event shapes selected by
//! `type`. Key names and mouse button names are resolved to Godot key codes
//! and button indices here; the tables are part of the wire contract, so the
//! adapter can validate names before they ever reach the game.

use serde::{Deserialize, Serialize};

/// One synthetic input event, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSpec {
    /// A named input-map action, e.g. `ui_accept` or a game-defined action.
    Action {
        action: String,
        #[serde(default = "default_pressed")]
        pressed: bool,
    },
    /// A keyboard key by name (see [`key_code`]).
    Key {
        key: String,
        #[serde(default = "default_pressed")]
        pressed: bool,
    },
    /// A mouse button by name (see [`mouse_button_index`]) at a position.
    MouseButton {
        button: String,
        #[serde(default = "default_pressed")]
        pressed: bool,
        x: f32,
        y: f32,
    },
    /// Pointer movement to a position, with an optional relative delta.
    MouseMotion {
        x: f32,
        y: f32,
        #[serde(default)]
        relative_x: f32,
        #[serde(default)]
        relative_y: f32,
    },
}

fn default_pressed() -> bool {
    true
}

/// The wire names of the four input types, for boundary validation.
pub const INPUT_TYPES: &[&str] = &["action", "key", "mouse_button", "mouse_motion"];

// Godot reserves bit 22 for non-printable keys; printable keys are their
// uppercase Unicode code point.
const SPECIAL: u32 = 1 << 22;

/// Resolve a key name to a Godot key code.
///
/// Single alphanumeric characters map to their uppercase code point; named
/// keys come from the table below. Unknown names return `None` and must be
/// rejected at the boundary rather than guessed at.
pub fn key_code(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next())
        && c.is_ascii_alphanumeric()
    {
        return Some(c.to_ascii_uppercase() as u32);
    }
    let code = match lower.as_str() {
        "space" => 32,
        "escape" | "esc" => SPECIAL | 1,
        "tab" => SPECIAL | 2,
        "backspace" => SPECIAL | 4,
        "enter" | "return" => SPECIAL | 5,
        "kp_enter" => SPECIAL | 6,
        "insert" => SPECIAL | 7,
        "delete" => SPECIAL | 8,
        "home" => SPECIAL | 13,
        "end" => SPECIAL | 14,
        "left" => SPECIAL | 15,
        "up" => SPECIAL | 16,
        "right" => SPECIAL | 17,
        "down" => SPECIAL | 18,
        "pageup" | "page_up" => SPECIAL | 19,
        "pagedown" | "page_down" => SPECIAL | 20,
        "shift" => SPECIAL | 21,
        "ctrl" | "control" => SPECIAL | 22,
        "meta" => SPECIAL | 23,
        "alt" => SPECIAL | 24,
        "f1" => SPECIAL | 28,
        "f2" => SPECIAL | 29,
        "f3" => SPECIAL | 30,
        "f4" => SPECIAL | 31,
        "f5" => SPECIAL | 32,
        "f6" => SPECIAL | 33,
        "f7" => SPECIAL | 34,
        "f8" => SPECIAL | 35,
        "f9" => SPECIAL | 36,
        "f10" => SPECIAL | 37,
        "f11" => SPECIAL | 38,
        "f12" => SPECIAL | 39,
        _ => return None,
    };
    Some(code)
}

/// Resolve a mouse button name to a Godot button index.
pub fn mouse_button_index(name: &str) -> Option<u32> {
    let index = match name.to_ascii_lowercase().as_str() {
        "left" => 1,
        "right" => 2,
        "middle" => 3,
        "wheel_up" => 4,
        "wheel_down" => 5,
        "wheel_left" => 6,
        "wheel_right" => 7,
        "xbutton1" | "back" => 8,
        "xbutton2" | "forward" => 9,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn printable_keys_map_to_code_points() {
        assert_eq!(key_code("a"), Some(65));
        assert_eq!(key_code("Z"), Some(90));
        assert_eq!(key_code("7"), Some(55));
    }

    #[test]
    fn named_keys_use_the_special_bit() {
        assert_eq!(key_code("escape"), Some(4194305));
        assert_eq!(key_code("enter"), Some(4194309));
        assert_eq!(key_code("Space"), Some(32));
        assert_eq!(key_code("F1"), Some(4194332));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(key_code("hyperspace"), None);
        assert_eq!(mouse_button_index("fourth"), None);
    }

    #[test]
    fn mouse_buttons_map_to_indices() {
        assert_eq!(mouse_button_index("left"), Some(1));
        assert_eq!(mouse_button_index("WHEEL_DOWN"), Some(5));
    }

    #[test]
    fn input_specs_round_trip_with_type_tags() {
        let spec = InputSpec::Key {
            key: "space".into(),
            pressed: true,
        };
        let wire = serde_json::to_string(&spec).unwrap();
        assert!(wire.contains(r#""type":"key""#));
        assert_eq!(serde_json::from_str::<InputSpec>(&wire).unwrap(), spec);
    }

    #[test]
    fn pressed_defaults_to_true() {
        let spec: InputSpec =
            serde_json::from_str(r#"{"type": "action", "action": "jump"}"#).unwrap();
        assert_eq!(
            spec,
            InputSpec::Action {
                action: "jump".into(),
                pressed: true
            }
        );
    }
}
