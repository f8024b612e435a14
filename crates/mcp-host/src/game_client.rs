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

//! Datagram client for the game helper.
//!
//! Every call uses a fresh ephemeral socket — request/response pairing rides
//! on the source port, so there is nothing to correlate. The helper serves
//! one datagram per game frame and requests are idempotent, so we retry
//! inside the deadline rather than assuming the first datagram wins. A game
//! that crashed (or was never running) simply never answers: the caller sees
//! the timeout, which is the correct observable behaviour.

use gdbridge_protocol::datagram::{GAME_DEADLINE_SECS, GAME_PORT, GameCommand};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

/// Per-attempt wait before re-sending inside the overall deadline.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum GameError {
    #[error(
        "the game did not answer within {0:?} — no scene is running, or it crashed mid-request"
    )]
    Timeout(Duration),
    #[error("game error: {0}")]
    Game(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad reply from game: {0}")]
    Protocol(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct GameClient {
    addr: SocketAddr,
    deadline: Duration,
}

impl Default for GameClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GameClient {
    pub fn new() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], GAME_PORT)),
            deadline: Duration::from_secs(GAME_DEADLINE_SECS),
        }
    }

    pub fn with_addr(addr: SocketAddr, deadline: Duration) -> Self {
        Self { addr, deadline }
    }

    /// One command, one reply. Retries within the deadline; surfaces the
    /// helper's `{"error": ...}` shape as [`GameError::Game`].
    pub async fn send(&self, command: &GameCommand) -> Result<Value, GameError> {
        let payload = serde_json::to_vec(command)?;
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        socket.connect(self.addr).await?;

        let started = tokio::time::Instant::now();
        let mut buf = vec![0u8; 65536];
        loop {
            if started.elapsed() >= self.deadline {
                return Err(GameError::Timeout(self.deadline));
            }
            socket.send(&payload).await?;

            match tokio::time::timeout(ATTEMPT_TIMEOUT, socket.recv(&mut buf)).await {
                Ok(Ok(n)) => {
                    let reply: Value = serde_json::from_slice(&buf[..n])?;
                    if let Some(error) = reply.get("error").and_then(Value::as_str) {
                        return Err(GameError::Game(error.to_string()));
                    }
                    return Ok(reply);
                }
                Ok(Err(e)) => {
                    // ICMP port-unreachable surfaces as ECONNREFUSED on a
                    // connected UDP socket: nothing is listening yet. Retry
                    // inside the deadline like any other silence.
                    debug!("game datagram receive failed, retrying: {e}");
                }
                Err(_elapsed) => {
                    debug!("game datagram attempt timed out, retrying");
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn stub_helper(reply: Value) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 65536];
            let (_, peer) = socket.recv_from(&mut buf).await.unwrap();
            socket
                .send_to(reply.to_string().as_bytes(), peer)
                .await
                .unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn evaluate_round_trips() {
        let addr = stub_helper(json!({"result": "42"})).await;
        let client = GameClient::with_addr(addr, Duration::from_secs(2));
        let reply = client
            .send(&GameCommand::Evaluate {
                expression: "6 * 7".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply["result"], "42");
    }

    #[tokio::test]
    async fn error_replies_become_game_errors() {
        let addr = stub_helper(json!({"error": "no such node"})).await;
        let client = GameClient::with_addr(addr, Duration::from_secs(2));
        let err = client.send(&GameCommand::Screenshot).await.unwrap_err();
        assert!(matches!(err, GameError::Game(m) if m.contains("no such node")));
    }

    #[tokio::test]
    async fn silence_is_a_timeout() {
        // Bind a socket that never answers.
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let _keep = socket;

        let client = GameClient::with_addr(addr, Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = client.send(&GameCommand::Screenshot).await.unwrap_err();
        assert!(matches!(err, GameError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
