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

//! The in-editor side of gdbridge.
//!
//! One [`EditorServer`] lives inside each Godot editor process and
//! multiplexes any number of adapter connections over a project-scoped Unix
//! stream socket. Everything is driven cooperatively from the editor's frame
//! loop: the embedding calls [`EditorServer::tick`] once per frame with the
//! scraped-editor surface (an [`editor::EditorUi`] implementation) and the
//! frame delta, and the server drains the accept backlog, reads each client
//! once, dispatches complete requests, writes replies, counts down the
//! auto-stop timer, and runs the startup-fault detector — all without ever
//! blocking the editor.
//!
//! Handlers that need a UI side-effect to land (a panel populating after a
//! click) return a `pending` result instead of waiting; adapters retry.

pub mod editor;
pub mod launch;
pub mod methods;
pub mod output;
pub mod router;
pub mod server;
pub mod testing;
pub mod transport;
pub mod widgets;

pub use server::EditorServer;

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the embedding. Per-request failures never appear here;
/// they travel back to the adapter as wire error objects.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Another live process already accepts connections on the socket path.
    /// Starting anyway would hijack its clients, so we refuse and leave the
    /// file untouched.
    #[error("another editor is already serving {}", .0.display())]
    SocketBusy(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
