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

//! The Unix-domain stream transport.
//!
//! Everything is non-blocking and polled from the frame tick: the accept
//! backlog is drained fully each frame (several adapters launched at once
//! must all connect within one frame), each client gets one read per frame,
//! and replies are written back inline.
//!
//! Descriptor hygiene is correctness here, not hardening: the editor
//! launches game child processes, and an inherited listener fd lets a dying
//! child tear down the parent's socket. Every descriptor we own is
//! close-on-exec — atomically at accept where the platform supports it —
//! and SIGPIPE is suppressed per-socket on Apple platforms and per-send on
//! Linux, because a signal default would kill the whole editor when an
//! adapter vanishes mid-write.

use crate::ServerError;
use gdbridge_protocol::framing::extract_lines;
use socket2::{Domain, SockAddr, Socket, Type};
use std::collections::HashMap;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Listen backlog; must cover the number of adapters a user plausibly
/// launches in the same instant.
const LISTEN_BACKLOG: i32 = 8;

const READ_CHUNK: usize = 4096;

#[cfg(target_os = "linux")]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: libc::c_int = 0;

/// Stable per-connection key, valid until the client drops.
pub type ClientKey = u64;

struct ClientConn {
    stream: UnixStream,
    buf: Vec<u8>,
}

pub struct StreamServer {
    listener: Socket,
    path: PathBuf,
    clients: HashMap<ClientKey, ClientConn>,
    next_key: ClientKey,
}

impl StreamServer {
    /// Bind the project socket, enforcing the ownership guard: if a live
    /// listener already answers on `path` this editor must not start and
    /// must not touch the file; a dead socket file is stale and is
    /// unlinked.
    pub fn bind(path: &Path) -> Result<Self, ServerError> {
        if UnixStream::connect(path).is_ok() {
            return Err(ServerError::SocketBusy(path.to_path_buf()));
        }
        if path.exists() {
            info!(?path, "removing stale socket file");
            std::fs::remove_file(path)?;
        }

        let listener = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        listener.set_cloexec(true)?;
        listener.set_nonblocking(true)?;
        #[cfg(target_vendor = "apple")]
        listener.set_nosigpipe(true)?;
        listener.bind(&SockAddr::unix(path)?)?;
        listener.listen(LISTEN_BACKLOG)?;

        info!(?path, "editor server listening");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            clients: HashMap::new(),
            next_key: 1,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Drain the whole accept backlog.
    pub fn accept_new(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((sock, _)) => {
                    if let Err(e) = Self::prepare_client(&sock) {
                        warn!("failed to configure accepted socket: {e}");
                        continue;
                    }
                    let key = self.next_key;
                    self.next_key += 1;
                    debug!(key, "adapter connected");
                    self.clients.insert(
                        key,
                        ClientConn {
                            stream: sock.into(),
                            buf: Vec::new(),
                        },
                    );
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    fn prepare_client(sock: &Socket) -> std::io::Result<()> {
        // accept(2) already applied SOCK_CLOEXEC where the platform can do
        // it atomically; setting it again is a no-op there and the fallback
        // everywhere else.
        sock.set_cloexec(true)?;
        sock.set_nonblocking(true)?;
        #[cfg(target_vendor = "apple")]
        sock.set_nosigpipe(true)?;
        Ok(())
    }

    /// One non-blocking read per client; returns every complete frame the
    /// reads produced, grouped in per-client arrival order.
    pub fn read_frames(&mut self) -> Vec<(ClientKey, String)> {
        let mut frames = Vec::new();
        let mut dead = Vec::new();

        let mut keys: Vec<ClientKey> = self.clients.keys().copied().collect();
        keys.sort_unstable();
        for key in keys {
            let conn = self.clients.get_mut(&key).expect("client key just listed");
            let mut chunk = [0u8; READ_CHUNK];
            match conn.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!(key, "adapter disconnected");
                    dead.push(key);
                }
                Ok(n) => {
                    conn.buf.extend_from_slice(&chunk[..n]);
                    for line in extract_lines(&mut conn.buf) {
                        frames.push((key, line));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    warn!(key, "read failed, dropping client: {e}");
                    dead.push(key);
                }
            }
        }
        for key in dead {
            self.clients.remove(&key);
        }
        frames
    }

    /// Write one newline-terminated frame to a client. A failed write is
    /// fatal for that client; returns whether the client is still with us.
    pub fn send(&mut self, key: ClientKey, frame: &str) -> bool {
        let Some(conn) = self.clients.get(&key) else {
            return false;
        };
        if let Err(e) = send_frame(&conn.stream, frame) {
            warn!(key, "write failed, dropping client: {e}");
            self.clients.remove(&key);
            return false;
        }
        true
    }

    /// Write one frame to every connected client (notifications).
    pub fn broadcast(&mut self, frame: &str) {
        let keys: Vec<ClientKey> = self.clients.keys().copied().collect();
        for key in keys {
            self.send(key, frame);
        }
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        // We only ever get here with a socket file this process created;
        // a server that refused to hijack a live path never constructs.
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = ?self.path, "failed to unlink socket file: {e}");
        }
    }
}

fn send_frame(stream: &UnixStream, frame: &str) -> std::io::Result<()> {
    let mut bytes = Vec::with_capacity(frame.len() + 1);
    bytes.extend_from_slice(frame.as_bytes());
    bytes.push(b'\n');

    let fd = stream.as_raw_fd();
    let mut written = 0;
    while written < bytes.len() {
        let n = unsafe {
            libc::send(
                fd,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
                SEND_FLAGS,
            )
        };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        written += n as usize;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};

    fn scratch_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("editor.sock")
    }

    #[test]
    fn second_server_refuses_a_live_socket_and_leaves_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);

        let _first = StreamServer::bind(&path).unwrap();
        let second = StreamServer::bind(&path);
        assert!(matches!(second, Err(ServerError::SocketBusy(_))));
        assert!(path.exists());
    }

    #[test]
    fn stale_socket_files_are_unlinked_and_rebound() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);

        {
            let _server = StreamServer::bind(&path).unwrap();
            assert!(path.exists());
        }
        // Simulate a crash leaving the file behind.
        std::fs::write(&path, b"").unwrap();
        let server = StreamServer::bind(&path).unwrap();
        assert!(path.exists());
        drop(server);
        assert!(!path.exists());
    }

    #[test]
    fn frames_split_and_merged_across_reads_are_delivered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);
        let mut server = StreamServer::bind(&path).unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        server.accept_new();
        assert_eq!(server.client_count(), 1);

        // Two frames in one write, then a frame split across writes.
        client.write_all(b"{\"id\":1}\n{\"id\":2}\n{\"id\"").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let frames = server.read_frames();
        assert_eq!(
            frames.iter().map(|(_, f)| f.as_str()).collect::<Vec<_>>(),
            vec!["{\"id\":1}", "{\"id\":2}"]
        );

        client.write_all(b":3}\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let frames = server.read_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1, "{\"id\":3}");
    }

    #[test]
    fn replies_come_back_on_the_same_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);
        let mut server = StreamServer::bind(&path).unwrap();

        let mut a = UnixStream::connect(&path).unwrap();
        let b = UnixStream::connect(&path).unwrap();
        server.accept_new();
        assert_eq!(server.client_count(), 2);

        a.write_all(b"{\"id\":1,\"method\":\"ping\"}\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let frames = server.read_frames();
        assert_eq!(frames.len(), 1);
        let (key, _) = frames[0].clone();
        assert!(server.send(key, "{\"id\":1,\"result\":{}}"));

        let mut reader = BufReader::new(a.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line.trim_end(), "{\"id\":1,\"result\":{}}");

        // The other connection saw nothing.
        b.set_nonblocking(true).unwrap();
        let mut other = BufReader::new(b);
        let mut buf = String::new();
        assert!(other.read_line(&mut buf).is_err());
    }
}
