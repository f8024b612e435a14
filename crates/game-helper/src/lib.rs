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

//! The in-game side of gdbridge.
//!
//! The helper runs as an autoload inside the launched game process. During
//! startup it consumes the one-shot overrides side-file the editor wrote;
//! afterwards it answers single-datagram requests — screenshot, expression
//! evaluation, synthetic input — on a fixed loopback port, one datagram per
//! frame, with no per-client state. Adapters retry on timeout; requests are
//! idempotent.
//!
//! The embedding implements [`runtime::GameRuntime`] against the engine and
//! calls [`server::GameHelper::poll`] from its per-frame callback.

pub mod input;
pub mod runtime;
pub mod server;
pub mod testing;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
