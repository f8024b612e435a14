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

//! Editor viewport capture.
//!
//! The editor shows a 2D and a 3D viewport; whichever of them are real
//! (collapsed ones shrink below a few pixels) are sampled post-draw,
//! composited side by side, and written to the well-known PNG path. Game
//! screenshots never pass through here — the adapter takes those straight
//! from the game process over the datagram port.

use super::MethodContext;
use gdbridge_protocol::envelope::ErrorObject;
use image::RgbaImage;
use serde_json::{Value, json};
use tracing::info;

/// Viewports smaller than this on either axis are collapsed placeholders.
const MIN_VIEWPORT_PX: u32 = 10;

pub fn get_screenshot(cx: &mut MethodContext) -> Result<Value, ErrorObject> {
    let captures: Vec<_> = cx
        .ui
        .capture_viewports()
        .into_iter()
        .filter(|c| {
            c.width >= MIN_VIEWPORT_PX
                && c.height >= MIN_VIEWPORT_PX
                && c.rgba.len() == (c.width * c.height * 4) as usize
        })
        .collect();

    if captures.is_empty() {
        return Err(ErrorObject::internal(
            "no editor viewport large enough to capture",
        ));
    }

    let width: u32 = captures.iter().map(|c| c.width).sum();
    let height: u32 = captures.iter().map(|c| c.height).max().unwrap_or(0);

    let mut canvas = RgbaImage::new(width, height);
    let mut x_off: i64 = 0;
    for cap in &captures {
        let img = RgbaImage::from_raw(cap.width, cap.height, cap.rgba.clone())
            .expect("capture length checked above");
        image::imageops::replace(&mut canvas, &img, x_off, 0);
        x_off += cap.width as i64;
    }

    let path = cx.state.screenshot_path.clone();
    canvas
        .save(&path)
        .map_err(|e| ErrorObject::internal(format!("failed to write screenshot: {e}")))?;

    info!(?path, width, height, "editor screenshot captured");
    Ok(json!({
        "path": path.to_string_lossy(),
        "width": width,
        "height": height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::ViewportCapture;
    use crate::server::ServerState;
    use crate::testing::FakeEditor;
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> ViewportCapture {
        ViewportCapture {
            width,
            height,
            rgba: rgba
                .iter()
                .copied()
                .cycle()
                .take((width * height * 4) as usize)
                .collect(),
        }
    }

    #[test]
    fn no_usable_viewport_is_a_server_error() {
        let mut state = ServerState::for_tests();
        let mut ed = FakeEditor::new();
        // Collapsed placeholder only.
        ed.set_viewports(vec![solid(4, 4, [0, 0, 0, 255])]);
        let mut cx = MethodContext {
            state: &mut state,
            ui: &mut ed,
            request_id: 1,
            client: 1,
        };
        assert!(get_screenshot(&mut cx).is_err());
    }

    #[test]
    fn viewports_are_combined_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ServerState::for_tests();
        state.screenshot_path = dir.path().join("editor.png");
        let mut ed = FakeEditor::new();
        ed.set_viewports(vec![
            solid(16, 12, [255, 0, 0, 255]),
            solid(20, 10, [0, 255, 0, 255]),
            solid(4, 4, [0, 0, 255, 255]), // skipped: under threshold
        ]);

        let mut cx = MethodContext {
            state: &mut state,
            ui: &mut ed,
            request_id: 1,
            client: 1,
        };
        let result = get_screenshot(&mut cx).unwrap();
        assert_eq!(result["width"], 36);
        assert_eq!(result["height"], 12);

        let saved = image::open(state.screenshot_path.clone()).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (36, 12));
        assert_eq!(saved.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(saved.get_pixel(16, 0).0, [0, 255, 0, 255]);
    }
}
