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

//! Client connection to the editor server: the request/reply correlator.
//!
//! One reader task owns the receive side of the socket and routes every
//! incoming frame by id to a registered waiter; frames with no waiter are
//! stale and dropped, id-less frames go to the bounded notification ring.
//! Ids come from an atomic monotone counter and are never reused for the
//! lifetime of this process. The write side is serialised behind a mutex so
//! concurrently running tool handlers cannot interleave line frames.
//!
//! Every wait is bounded: a waiter completes on its reply, its deadline, or
//! caller cancellation, and its slot is removed in all three cases. When the
//! connection drops, outstanding waiters fail immediately and the process is
//! expected to exit — the MCP host respawns adapters; we do not reconnect.

use gdbridge_protocol::envelope::{Frame, OutputRecord, Reply, Request};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The notification ring coalesces output bursts; it is not authoritative
/// (the editor's output mirror is), so old records are simply shed.
const NOTIFICATION_RING_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to editor socket {} after {attempts} attempts: {source}", .path.display())]
    Connect {
        path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },
    #[error("editor connection lost")]
    ConnectionLost,
    #[error("'{method}' timed out after {seconds}s")]
    Timeout { method: String, seconds: u64 },
    #[error("request cancelled")]
    Cancelled,
    #[error("editor error {code}: {message}")]
    Editor { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

struct Inner {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    waiters: StdMutex<HashMap<u64, oneshot::Sender<Reply>>>,
    next_id: AtomicU64,
    notifications: StdMutex<VecDeque<OutputRecord>>,
    lost: CancellationToken,
    request_timeout: Duration,
}

#[derive(Clone)]
pub struct EditorClient {
    inner: Arc<Inner>,
}

impl EditorClient {
    /// Connect to the editor socket with bounded retry.
    pub async fn connect(
        path: &Path,
        attempts: u32,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let attempts = attempts.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
            match UnixStream::connect(path).await {
                Ok(stream) => {
                    info!(path = %path.display(), "connected to editor");
                    return Ok(Self::start(stream, request_timeout));
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        attempts,
                        "connect to {} failed: {e}",
                        path.display()
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(ClientError::Connect {
            path: path.to_path_buf(),
            attempts,
            source: last_err.expect("at least one attempt was made"),
        })
    }

    fn start(stream: UnixStream, request_timeout: Duration) -> Self {
        let (read_half, write_half) = stream.into_split();
        let inner = Arc::new(Inner {
            writer: tokio::sync::Mutex::new(write_half),
            waiters: StdMutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            notifications: StdMutex::new(VecDeque::new()),
            lost: CancellationToken::new(),
            request_timeout,
        });
        tokio::spawn(read_loop(read_half, inner.clone()));
        Self { inner }
    }

    /// The connection died (reader saw EOF or an error).
    pub fn is_lost(&self) -> bool {
        self.inner.lost.is_cancelled()
    }

    /// Waiter slots currently armed; must return to zero after every
    /// completed, timed-out, or cancelled wait.
    pub fn pending_requests(&self) -> usize {
        self.inner.waiters.lock().expect("waiters lock").len()
    }

    /// Drain everything currently in the notification ring.
    pub fn drain_notifications(&self) -> Vec<OutputRecord> {
        let mut ring = self.inner.notifications.lock().expect("ring lock");
        ring.drain(..).collect()
    }

    /// Send one request and wait for its reply under the default deadline.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        self.request(method, params, self.inner.request_timeout, None)
            .await
            .map(|(_, value)| value)
    }

    /// Send one request and wait under an explicit deadline and optional
    /// cancellation. Returns the request id with the result so callers can
    /// arm a deferred wait for the same id.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(u64, Value), ClientError> {
        if self.is_lost() {
            return Err(ClientError::ConnectionLost);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = serde_json::to_string(&Request::new(id, method, params))?;

        // Arm before writing: the reply can race the write returning.
        let rx = self.arm_waiter(id);

        {
            let mut writer = self.inner.writer.lock().await;
            let write = async {
                writer.write_all(frame.as_bytes()).await?;
                writer.write_all(b"\n").await
            };
            if let Err(e) = write.await {
                self.remove_waiter(id);
                return Err(ClientError::Transport(e));
            }
        }

        let value = self.await_reply(id, method, rx, deadline, cancel).await?;
        Ok((id, value))
    }

    /// Re-arm a waiter for a request id whose first reply (the ack) was
    /// already consumed, and wait for the server's deferred completion.
    pub async fn wait_deferred(&self, id: u64, deadline: Duration) -> Result<Value, ClientError> {
        if self.is_lost() {
            return Err(ClientError::ConnectionLost);
        }
        let rx = self.arm_waiter(id);
        self.await_reply(id, "deferred completion", rx, deadline, None)
            .await
    }

    /// Call a pending-eligible method, honoring the pending protocol:
    /// exactly one automatic retry after the server's hinted delay
    /// (`default_delay_ms` when the hint is absent). A second pending result
    /// is returned as-is for the tool layer to phrase.
    pub async fn call_with_pending_retry(
        &self,
        method: &str,
        params: Option<Value>,
        default_delay_ms: u64,
    ) -> Result<Value, ClientError> {
        let first = self.call(method, params.clone()).await?;
        if !is_pending(&first) {
            return Ok(first);
        }
        let delay = first
            .get("retry_after_ms")
            .and_then(Value::as_u64)
            .unwrap_or(default_delay_ms);
        debug!(method, delay, "pending result; retrying once");
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.call(method, params).await
    }

    fn arm_waiter(&self, id: u64) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .waiters
            .lock()
            .expect("waiters lock")
            .insert(id, tx);
        rx
    }

    fn remove_waiter(&self, id: u64) {
        self.inner.waiters.lock().expect("waiters lock").remove(&id);
    }

    async fn await_reply(
        &self,
        id: u64,
        method: &str,
        rx: oneshot::Receiver<Reply>,
        deadline: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ClientError> {
        let outcome = tokio::time::timeout(deadline, async {
            match cancel {
                Some(token) => tokio::select! {
                    reply = rx => reply.map_err(|_| ClientError::ConnectionLost),
                    _ = token.cancelled() => Err(ClientError::Cancelled),
                },
                None => rx.await.map_err(|_| ClientError::ConnectionLost),
            }
        })
        .await;

        let reply = match outcome {
            Err(_elapsed) => {
                self.remove_waiter(id);
                return Err(ClientError::Timeout {
                    method: method.to_string(),
                    seconds: deadline.as_secs(),
                });
            }
            Ok(Err(e)) => {
                self.remove_waiter(id);
                return Err(e);
            }
            Ok(Ok(reply)) => reply,
        };

        if let Some(error) = reply.error {
            return Err(ClientError::Editor {
                code: error.code,
                message: error.message,
            });
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

/// Whether a result body carries the deferred-completion pending flag.
pub fn is_pending(result: &Value) -> bool {
    result
        .get("pending")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

async fn read_loop(read_half: OwnedReadHalf, inner: Arc<Inner>) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match Frame::parse(line) {
                    Ok(Frame::Reply(reply)) => deliver(&inner, reply),
                    Ok(Frame::Output(record)) => {
                        let mut ring = inner.notifications.lock().expect("ring lock");
                        if ring.len() == NOTIFICATION_RING_CAPACITY {
                            ring.pop_front();
                        }
                        ring.push_back(record);
                    }
                    Ok(Frame::UnknownNotification) => {
                        debug!("dropping unknown notification");
                    }
                    Err(e) => warn!("unparseable frame from editor: {e}"),
                }
            }
            Ok(None) => {
                info!("editor closed the connection");
                break;
            }
            Err(e) => {
                warn!("read from editor failed: {e}");
                break;
            }
        }
    }

    // Fail every outstanding waiter; their receivers see a closed channel.
    inner.lost.cancel();
    inner.waiters.lock().expect("waiters lock").clear();
}

fn deliver(inner: &Arc<Inner>, reply: Reply) {
    let waiter = inner
        .waiters
        .lock()
        .expect("waiters lock")
        .remove(&reply.id);
    match waiter {
        Some(tx) => {
            if tx.send(reply).is_err() {
                debug!("waiter abandoned before its reply arrived");
            }
        }
        None => debug!(id = reply.id, "stale reply dropped (no waiter)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbridge_protocol::envelope::Request;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;

    struct StubEditor {
        listener: UnixListener,
        path: PathBuf,
        _dir: tempfile::TempDir,
    }

    impl StubEditor {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("editor.sock");
            let listener = UnixListener::bind(&path).unwrap();
            Self {
                listener,
                path,
                _dir: dir,
            }
        }
    }

    async fn connect(stub: &StubEditor) -> EditorClient {
        EditorClient::connect(&stub.path, 1, Duration::from_secs(2))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ping_round_trip_within_the_deadline() {
        let stub = StubEditor::new();
        let server = async {
            let (stream, _) = stub.listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let req: Request = serde_json::from_str(&line).unwrap();
            assert_eq!(req.method, "ping");
            let reply = format!(
                "{}\n",
                json!({"id": req.id, "result": {"status": "ok"}})
            );
            write.write_all(reply.as_bytes()).await.unwrap();
            // Keep the connection open until the client is done.
            tokio::time::sleep(Duration::from_millis(200)).await;
        };

        let client_side = async {
            let client = connect(&stub).await;
            let result = client.call("ping", None).await.unwrap();
            assert_eq!(result["status"], "ok");
            assert_eq!(client.pending_requests(), 0);
        };

        tokio::join!(server, client_side);
    }

    #[tokio::test]
    async fn hundred_concurrent_callers_produce_distinct_ids() {
        let stub = StubEditor::new();
        let path = stub.path.clone();

        let server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut seen = Vec::new();
            for _ in 0..100 {
                let line = lines.next_line().await.unwrap().unwrap();
                let req: Request = serde_json::from_str(&line).unwrap();
                seen.push(req.id);
                let reply = format!("{}\n", json!({"id": req.id, "result": {}}));
                write.write_all(reply.as_bytes()).await.unwrap();
            }
            seen
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(5))
            .await
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..100 {
            let c = client.clone();
            handles.push(tokio::spawn(async move { c.call("ping", None).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let seen = server.await.unwrap();
        let distinct: HashSet<u64> = seen.iter().copied().collect();
        assert_eq!(distinct.len(), 100);
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn timeout_unblocks_and_removes_the_waiter() {
        let stub = StubEditor::new();
        let path = stub.path.clone();
        // Accept but never reply.
        let _server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(stream);
        });

        let client = EditorClient::connect(&path, 1, Duration::from_millis(100))
            .await
            .unwrap();
        let err = client.call("get_output", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn cancellation_unblocks_and_removes_the_waiter() {
        let stub = StubEditor::new();
        let path = stub.path.clone();
        let _server = tokio::spawn(async move {
            let (_stream, _) = stub.listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(30))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = client
            .request("stop_scene", None, Duration::from_secs(30), Some(&cancel))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn duplicate_replies_are_dropped_not_misdelivered() {
        let stub = StubEditor::new();
        let path = stub.path.clone();

        let server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();

            let line = lines.next_line().await.unwrap().unwrap();
            let req: Request = serde_json::from_str(&line).unwrap();
            // Same id twice: the second has no waiter and must be dropped.
            let reply = format!("{}\n", json!({"id": req.id, "result": {"n": 1}}));
            write.write_all(reply.as_bytes()).await.unwrap();
            let dup = format!("{}\n", json!({"id": req.id, "result": {"n": 2}}));
            write.write_all(dup.as_bytes()).await.unwrap();

            // A later request must still correlate correctly.
            let line = lines.next_line().await.unwrap().unwrap();
            let req: Request = serde_json::from_str(&line).unwrap();
            let reply = format!("{}\n", json!({"id": req.id, "result": {"n": 3}}));
            write.write_all(reply.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(5))
            .await
            .unwrap();
        let first = client.call("ping", None).await.unwrap();
        assert_eq!(first["n"], 1);
        // Give the duplicate time to arrive and be discarded.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = client.call("ping", None).await.unwrap();
        assert_eq!(second["n"], 3);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn deferred_replies_reach_a_rearmed_waiter() {
        let stub = StubEditor::new();
        let path = stub.path.clone();

        let server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let req: Request = serde_json::from_str(&line).unwrap();
            let ack = format!(
                "{}\n",
                json!({"id": req.id, "result": {"status": "launching"}})
            );
            write.write_all(ack.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            let deferred = format!(
                "{}\n",
                json!({"id": req.id, "result": {"success": true, "error_detected": false}})
            );
            write.write_all(deferred.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(5))
            .await
            .unwrap();
        let (id, ack) = client
            .request("run_main_scene", None, Duration::from_secs(5), None)
            .await
            .unwrap();
        assert_eq!(ack["status"], "launching");

        let outcome = client
            .wait_deferred(id, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome["error_detected"], false);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_loss_fails_outstanding_waiters() {
        let stub = StubEditor::new();
        let path = stub.path.clone();
        let _server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(stream); // editor dies mid-request
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(30))
            .await
            .unwrap();
        let err = client.call("ping", None).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost));
        assert!(client.is_lost());
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn notification_ring_is_bounded() {
        let stub = StubEditor::new();
        let path = stub.path.clone();

        let server = tokio::spawn(async move {
            let (stream, _) = stub.listener.accept().await.unwrap();
            let (_read, mut write) = stream.into_split();
            for i in 0..300 {
                let frame = format!(
                    "{}\n",
                    json!({"result": {"type": "output", "kind": "print", "message": format!("line {i}"), "timestamp": 0.0}})
                );
                write.write_all(frame.as_bytes()).await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
        });

        let client = EditorClient::connect(&path, 1, Duration::from_secs(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let records = client.drain_notifications();
        assert_eq!(records.len(), 256);
        // Oldest entries were shed, newest survive.
        assert_eq!(records.last().unwrap().message, "line 299");
        server.await.unwrap();
    }
}
