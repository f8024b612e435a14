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

//! The autoload-overrides side-file.
//!
//! A scene launch may carry property overrides for game autoloads. The
//! editor process cannot reach into the game process directly, so the
//! overrides ride across the boundary in a one-shot JSON file: written by
//! the editor server immediately before launch, consumed (applied, then
//! deleted) by the game helper during its startup. Absence of the file means
//! no overrides. The file maps autoload name → property name → value.

use crate::ProtocolError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Well-known location of the side-file.
pub const OVERRIDES_PATH: &str = "/tmp/gdbridge-overrides.json";

/// autoload name → property name → value
pub type OverrideMap = BTreeMap<String, BTreeMap<String, Value>>;

/// Materialise `overrides` at `path`. An empty or absent map deletes any
/// existing file instead, so a launch without overrides never lets a stale
/// file leak into the next game process.
pub fn write_overrides(path: &Path, overrides: Option<&OverrideMap>) -> Result<(), ProtocolError> {
    match overrides {
        Some(map) if !map.is_empty() => {
            let json = serde_json::to_string(map)?;
            std::fs::write(path, json)?;
        }
        _ => remove_if_present(path)?,
    }
    Ok(())
}

/// Read the side-file, or `None` if it does not exist.
pub fn read_overrides(path: &Path) -> Result<Option<OverrideMap>, ProtocolError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Consume the side-file: read it and delete it in one motion. The game
/// helper calls this during startup; the deletion is what makes the handoff
/// one-shot.
pub fn take_overrides(path: &Path) -> Result<Option<OverrideMap>, ProtocolError> {
    let overrides = read_overrides(path)?;
    if overrides.is_some() {
        remove_if_present(path)?;
    }
    Ok(overrides)
}

fn remove_if_present(path: &Path) -> Result<(), ProtocolError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> OverrideMap {
        let mut props = BTreeMap::new();
        props.insert("x".to_string(), json!(1));
        props.insert("label".to_string(), json!("hi"));
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), props);
        map
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let map = sample();

        write_overrides(&path, Some(&map)).unwrap();
        assert_eq!(read_overrides(&path).unwrap(), Some(map));
    }

    #[test]
    fn empty_map_deletes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");

        write_overrides(&path, Some(&sample())).unwrap();
        assert!(path.exists());

        write_overrides(&path, Some(&OverrideMap::new())).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn none_behaves_like_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");

        write_overrides(&path, Some(&sample())).unwrap();
        write_overrides(&path, None).unwrap();
        assert!(!path.exists());

        // Deleting an already-absent file is fine.
        write_overrides(&path, None).unwrap();
    }

    #[test]
    fn take_is_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let map = sample();

        write_overrides(&path, Some(&map)).unwrap();
        assert_eq!(take_overrides(&path).unwrap(), Some(map));
        assert!(!path.exists());
        assert_eq!(take_overrides(&path).unwrap(), None);
    }
}
