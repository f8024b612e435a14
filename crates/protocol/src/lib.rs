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

//! Wire protocol shared between the three gdbridge processes.
//!
//! Everything that crosses a process boundary is defined here:
//!
//! - [`envelope`]: the line-framed JSON request/reply/notification envelopes
//!   spoken between the MCP adapter and the editor server, and the error
//!   codes carried on them.
//! - [`framing`]: newline frame extraction from partial-read buffers.
//! - [`socket_path`]: project-scoped Unix socket path derivation, shared so
//!   that an adapter launched in a project directory and the editor serving
//!   that project always agree on the rendezvous point.
//! - [`overrides`]: the one-shot autoload-overrides side-file handed from
//!   the editor server to the game helper across the process boundary.
//! - [`datagram`]: the single-datagram command envelopes served by the game
//!   helper on its fixed loopback port.
//! - [`input`]: the key-name and mouse-button-name mapping tables that form
//!   part of the `input` datagram contract.

pub mod datagram;
pub mod envelope;
pub mod framing;
pub mod input;
pub mod overrides;
pub mod socket_path;

use thiserror::Error;

/// Errors from protocol-level file and parse operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Well-known path the editor screenshot is written to, overwritten on every
/// capture.
pub const EDITOR_SCREENSHOT_PATH: &str = "/tmp/gdbridge-editor.png";

/// Well-known path the game screenshot is written to, overwritten on every
/// capture.
pub const GAME_SCREENSHOT_PATH: &str = "/tmp/gdbridge-game.png";
