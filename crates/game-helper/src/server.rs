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

//! The datagram server polled once per game frame.
//!
//! One request datagram in, one reply datagram out, no per-client state.
//! Serving a single request per frame is enough: requests are idempotent
//! and callers retry on timeout, so several adapters hammering the port
//! just take a few frames to drain.

use crate::HelperError;
use crate::input::resolve;
use crate::runtime::GameRuntime;
use gdbridge_protocol::GAME_SCREENSHOT_PATH;
use gdbridge_protocol::datagram::{
    DatagramError, EvaluateReply, GAME_PORT, GameCommand, InputReply, ScreenshotReply,
};
use gdbridge_protocol::overrides::{OVERRIDES_PATH, take_overrides};
use image::RgbaImage;
use std::net::UdpSocket;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct GameHelper {
    socket: UdpSocket,
    screenshot_path: PathBuf,
    overrides_path: PathBuf,
}

impl GameHelper {
    /// Bind the well-known loopback port.
    pub fn bind() -> Result<Self, HelperError> {
        Self::bind_at(GAME_PORT)
    }

    pub fn bind_at(port: u16) -> Result<Self, HelperError> {
        let socket = UdpSocket::bind(("127.0.0.1", port))?;
        socket.set_nonblocking(true)?;
        info!(port, "game helper listening");
        Ok(Self {
            socket,
            screenshot_path: PathBuf::from(GAME_SCREENSHOT_PATH),
            overrides_path: PathBuf::from(OVERRIDES_PATH),
        })
    }

    /// The port actually bound (ephemeral in tests).
    pub fn port(&self) -> u16 {
        self.socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    pub fn set_screenshot_path(&mut self, path: PathBuf) {
        self.screenshot_path = path;
    }

    pub fn set_overrides_path(&mut self, path: PathBuf) {
        self.overrides_path = path;
    }

    /// Startup-time half of the overrides handoff: read the side-file,
    /// apply every autoload property it names, and delete it. Called from
    /// the autoload's ready callback, before the first frame runs.
    pub fn apply_startup_overrides(&self, rt: &mut dyn GameRuntime) {
        let overrides = match take_overrides(&self.overrides_path) {
            Ok(Some(overrides)) => overrides,
            Ok(None) => return,
            Err(e) => {
                warn!("failed to read overrides file: {e}");
                return;
            }
        };
        for (autoload, props) in &overrides {
            for (property, value) in props {
                if rt.apply_override(autoload, property, value) {
                    info!(%autoload, %property, "override applied");
                } else {
                    warn!(%autoload, %property, "override target not found, skipping");
                }
            }
        }
    }

    /// Serve at most one datagram. Called once per frame.
    pub fn poll(&mut self, rt: &mut dyn GameRuntime) {
        let mut buf = [0u8; 65536];
        let (len, peer) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
            Err(e) => {
                warn!("datagram receive failed: {e}");
                return;
            }
        };

        let reply = self.handle(&buf[..len], rt);
        if let Err(e) = self.socket.send_to(reply.as_bytes(), peer) {
            warn!("datagram send failed: {e}");
        }
    }

    fn handle(&self, bytes: &[u8], rt: &mut dyn GameRuntime) -> String {
        let command: GameCommand = match serde_json::from_slice(bytes) {
            Ok(command) => command,
            Err(e) => {
                debug!("unparseable datagram: {e}");
                return error_reply(format!("bad request: {e}"));
            }
        };

        match command {
            GameCommand::Screenshot => match self.screenshot(rt) {
                Ok(reply) => serde_json::to_string(&reply).expect("reply serializes"),
                Err(e) => error_reply(e),
            },
            GameCommand::Evaluate { expression } => match rt.evaluate(&expression) {
                Ok(result) => serde_json::to_string(&EvaluateReply { result })
                    .expect("reply serializes"),
                Err(e) => error_reply(e),
            },
            GameCommand::Input { event } => {
                let resolved = match resolve(&event) {
                    Ok(resolved) => resolved,
                    Err(e) => return error_reply(e),
                };
                match rt.dispatch_input(resolved) {
                    Ok(()) => serde_json::to_string(&InputReply::ok()).expect("reply serializes"),
                    Err(e) => error_reply(e),
                }
            }
        }
    }

    fn screenshot(&self, rt: &mut dyn GameRuntime) -> Result<ScreenshotReply, String> {
        let capture = rt.capture_frame()?;
        if capture.rgba.len() != (capture.width * capture.height * 4) as usize {
            return Err("viewport returned a malformed pixel buffer".to_string());
        }
        let img = RgbaImage::from_raw(capture.width, capture.height, capture.rgba)
            .ok_or_else(|| "viewport returned a malformed pixel buffer".to_string())?;
        img.save(&self.screenshot_path)
            .map_err(|e| format!("failed to write screenshot: {e}"))?;
        Ok(ScreenshotReply {
            path: self.screenshot_path.to_string_lossy().into_owned(),
            width: capture.width,
            height: capture.height,
        })
    }
}

fn error_reply(message: impl Into<String>) -> String {
    serde_json::to_string(&DatagramError::new(message)).expect("error serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRuntime;
    use gdbridge_protocol::overrides::write_overrides;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn helper_on_ephemeral_port(dir: &tempfile::TempDir) -> GameHelper {
        let mut helper = GameHelper::bind_at(0).unwrap();
        helper.set_screenshot_path(dir.path().join("game.png"));
        helper.set_overrides_path(dir.path().join("overrides.json"));
        helper
    }

    fn exchange(helper: &mut GameHelper, rt: &mut FakeRuntime, request: &str) -> Value {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .send_to(request.as_bytes(), ("127.0.0.1", helper.port()))
            .unwrap();
        // A couple of frames' worth of polling.
        for _ in 0..10 {
            helper.poll(rt);
        }
        client
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = [0u8; 65536];
        let (n, _) = client.recv_from(&mut buf).unwrap();
        serde_json::from_slice(&buf[..n]).unwrap()
    }

    #[test]
    fn evaluate_round_trips_through_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let mut helper = helper_on_ephemeral_port(&dir);
        let mut rt = FakeRuntime::new();
        rt.stub_expression("1 + 2", "3");

        let reply = exchange(
            &mut helper,
            &mut rt,
            r#"{"cmd": "evaluate", "expression": "1 + 2"}"#,
        );
        assert_eq!(reply["result"], "3");

        let reply = exchange(
            &mut helper,
            &mut rt,
            r#"{"cmd": "evaluate", "expression": "boom()"}"#,
        );
        assert!(reply["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn screenshot_writes_the_png_and_reports_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let mut helper = helper_on_ephemeral_port(&dir);
        let mut rt = FakeRuntime::new();
        rt.set_frame(32, 24, [10, 20, 30, 255]);

        let reply = exchange(&mut helper, &mut rt, r#"{"cmd": "screenshot"}"#);
        assert_eq!(reply["width"], 32);
        assert_eq!(reply["height"], 24);

        let path = reply["path"].as_str().unwrap();
        let saved = image::open(path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (32, 24));
        assert_eq!(saved.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn input_dispatches_resolved_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut helper = helper_on_ephemeral_port(&dir);
        let mut rt = FakeRuntime::new();

        let reply = exchange(
            &mut helper,
            &mut rt,
            r#"{"cmd": "input", "type": "key", "key": "space", "pressed": true}"#,
        );
        assert_eq!(reply["status"], "ok");
        assert_eq!(rt.dispatched().len(), 1);

        let reply = exchange(
            &mut helper,
            &mut rt,
            r#"{"cmd": "input", "type": "key", "key": "nonesuch"}"#,
        );
        assert!(reply["error"].as_str().unwrap().contains("nonesuch"));
        assert_eq!(rt.dispatched().len(), 1);
    }

    #[test]
    fn malformed_datagrams_get_an_error_reply() {
        let dir = tempfile::tempdir().unwrap();
        let mut helper = helper_on_ephemeral_port(&dir);
        let mut rt = FakeRuntime::new();

        let reply = exchange(&mut helper, &mut rt, "{garbage");
        assert!(reply["error"].as_str().unwrap().contains("bad request"));
    }

    #[test]
    fn startup_overrides_are_applied_once_and_the_file_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let helper = {
            let mut h = GameHelper::bind_at(0).unwrap();
            h.set_overrides_path(dir.path().join("overrides.json"));
            h
        };
        let mut rt = FakeRuntime::new();
        rt.add_autoload_property("A", "x");

        let mut props = BTreeMap::new();
        props.insert("x".to_string(), json!(1));
        props.insert("ghost".to_string(), json!(2));
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), props);
        write_overrides(&dir.path().join("overrides.json"), Some(&map)).unwrap();

        helper.apply_startup_overrides(&mut rt);
        assert_eq!(rt.applied_overrides(), vec![("A".to_string(), "x".to_string(), json!(1))]);
        // One-shot: the file is gone before the first frame.
        assert!(!dir.path().join("overrides.json").exists());

        // A second startup (next launch, no file) applies nothing.
        helper.apply_startup_overrides(&mut rt);
        assert_eq!(rt.applied_overrides().len(), 1);
    }
}
