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

//! Project-scoped socket path derivation.
//!
//! The editor server derives the rendezvous path from its project directory;
//! an adapter derives it from its own working directory. Both sides apply
//! the identical transform, so an adapter launched inside a project always
//! finds the editor serving that project. `GDBRIDGE_SOCKET` overrides the
//! derivation with a verbatim path on both sides.

use std::path::{Path, PathBuf};

/// Environment variable naming a full socket path, used verbatim when set.
pub const SOCKET_ENV_VAR: &str = "GDBRIDGE_SOCKET";

const SOCKET_DIR: &str = "/tmp";
const SOCKET_PREFIX: &str = "gdbridge";
const SOCKET_EXT: &str = "sock";

/// Socket path for `project_dir`, honoring the environment override.
pub fn socket_path(project_dir: &Path) -> PathBuf {
    match std::env::var(SOCKET_ENV_VAR) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => derived_socket_path(project_dir),
    }
}

/// The derived (non-overridden) socket path for `project_dir`.
pub fn derived_socket_path(project_dir: &Path) -> PathBuf {
    let basename = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!(
        "{SOCKET_DIR}/{SOCKET_PREFIX}-{}.{SOCKET_EXT}",
        project_slug(&basename)
    ))
}

/// Sanitise a project directory basename into a socket-safe slug: lowercase
/// alphanumerics, every other character mapped to `-`, runs collapsed,
/// trailing `-` trimmed.
pub fn project_slug(basename: &str) -> String {
    let mut slug = String::with_capacity(basename.len());
    let mut last_dash = false;
    for c in basename.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("project");
    }
    slug
}
