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

//! Resolution of wire input payloads into dispatchable engine events.

use gdbridge_protocol::input::{InputSpec, key_code, mouse_button_index};

/// An input event with names resolved to engine codes, ready for the
/// dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInput {
    Action {
        action: String,
        pressed: bool,
    },
    Key {
        key_code: u32,
        pressed: bool,
    },
    MouseButton {
        button_index: u32,
        pressed: bool,
        position: (f32, f32),
    },
    MouseMotion {
        position: (f32, f32),
        relative: (f32, f32),
    },
}

/// Resolve a wire spec. Unknown key or button names are rejected with the
/// message the datagram error reply carries.
pub fn resolve(spec: &InputSpec) -> Result<ResolvedInput, String> {
    match spec {
        InputSpec::Action { action, pressed } => {
            if action.is_empty() {
                return Err("empty action name".to_string());
            }
            Ok(ResolvedInput::Action {
                action: action.clone(),
                pressed: *pressed,
            })
        }
        InputSpec::Key { key, pressed } => {
            let key_code =
                key_code(key).ok_or_else(|| format!("unknown key name: {key}"))?;
            Ok(ResolvedInput::Key {
                key_code,
                pressed: *pressed,
            })
        }
        InputSpec::MouseButton {
            button,
            pressed,
            x,
            y,
        } => {
            let button_index = mouse_button_index(button)
                .ok_or_else(|| format!("unknown mouse button: {button}"))?;
            Ok(ResolvedInput::MouseButton {
                button_index,
                pressed: *pressed,
                position: (*x, *y),
            })
        }
        InputSpec::MouseMotion {
            x,
            y,
            relative_x,
            relative_y,
        } => Ok(ResolvedInput::MouseMotion {
            position: (*x, *y),
            relative: (*relative_x, *relative_y),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_names_resolve_to_codes() {
        let spec = InputSpec::Key {
            key: "enter".into(),
            pressed: true,
        };
        assert_eq!(
            resolve(&spec).unwrap(),
            ResolvedInput::Key {
                key_code: 4194309,
                pressed: true
            }
        );
    }

    #[test]
    fn unknown_names_carry_the_offender_in_the_error() {
        let spec = InputSpec::Key {
            key: "warp".into(),
            pressed: true,
        };
        assert!(resolve(&spec).unwrap_err().contains("warp"));

        let spec = InputSpec::MouseButton {
            button: "thumb9".into(),
            pressed: true,
            x: 0.0,
            y: 0.0,
        };
        assert!(resolve(&spec).unwrap_err().contains("thumb9"));
    }

    #[test]
    fn mouse_motion_carries_position_and_delta() {
        let spec = InputSpec::MouseMotion {
            x: 100.0,
            y: 80.0,
            relative_x: 5.0,
            relative_y: -2.0,
        };
        assert_eq!(
            resolve(&spec).unwrap(),
            ResolvedInput::MouseMotion {
                position: (100.0, 80.0),
                relative: (5.0, -2.0)
            }
        );
    }
}
