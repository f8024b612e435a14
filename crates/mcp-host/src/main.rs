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

//! gdbridge MCP Host
//!
//! Model Context Protocol server that lets AI assistants drive a running
//! Godot editor: run scenes, tail output, inspect the remote scene tree,
//! control the debugger, take screenshots, and poke the running game.
//!
//! One adapter process serves one MCP client session. It connects to the
//! editor's project-scoped Unix socket (derived from the working directory,
//! so launch it from the project you have open) and exits when the session
//! ends or the editor goes away — the MCP host respawns it per session.
//!
//! # Usage
//!
//! ```bash
//! gdbridge-mcp-host
//! ```
//!
//! Or against an explicit socket:
//!
//! ```bash
//! gdbridge-mcp-host --socket /tmp/gdbridge-my-game.sock
//! ```

mod editor_client;
mod game_client;
mod mcp_server;
mod mcp_types;
mod tools;

use clap::Parser;
use clap_derive::Parser;
use editor_client::EditorClient;
use eyre::Result;
use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use game_client::GameClient;
use gdbridge_protocol::socket_path::socket_path;
use mcp_server::McpServer;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// gdbridge MCP Host - AI assistant interface to a running Godot editor
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(name = "gdbridge-mcp-host")]
#[command(about = "Model Context Protocol server bridging MCP clients to a Godot editor")]
#[command(version)]
struct Args {
    /// Editor socket path (overrides the project-derived path and the
    /// GDBRIDGE_SOCKET environment variable)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Per-request deadline, in seconds
    #[arg(long, default_value = "30")]
    request_timeout_seconds: u64,

    /// Connection attempts before giving up (delays grow linearly)
    #[arg(long, default_value = "3")]
    connect_attempts: u32,

    /// Enable debug logging (logs go to stderr to avoid interfering with MCP)
    #[arg(long, default_value = "false")]
    debug: bool,

    /// YAML config file to use (overrides CLI args)
    #[arg(long)]
    config_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();
    let config_file = cli_args.config_file.clone();
    let mut args_figment = Figment::new().merge(Serialized::defaults(cli_args));
    if let Some(config_file) = config_file {
        args_figment = args_figment.merge(Yaml::file(config_file));
    }
    let args: Args = args_figment.extract()?;

    setup_logging(args.debug)?;

    let socket = match &args.socket {
        Some(path) => path.clone(),
        None => socket_path(&std::env::current_dir()?),
    };
    info!("gdbridge MCP Host starting, editor socket: {}", socket.display());

    // Exit non-zero if the editor can't be reached: the MCP host surfaces
    // the diagnostic and the user gets to notice the editor isn't running.
    let editor = EditorClient::connect(
        &socket,
        args.connect_attempts,
        Duration::from_secs(args.request_timeout_seconds),
    )
    .await?;

    let game = GameClient::new();

    let mut server = McpServer::new(editor, game);
    server.run_stdio().await?;

    info!("gdbridge MCP Host shut down cleanly");
    Ok(())
}

/// Set up logging to stderr (stdout carries MCP frames)
fn setup_logging(debug: bool) -> Result<()> {
    let filter = if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        env_filter
    } else {
        let level = if debug { "debug" } else { "info" };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    Ok(())
}
