//! Remote inspector command-line client: entry point.
//!
//! Connects to an application running with its debugging agent enabled,
//! prints what the agent reports (logs, network traffic, UI snapshots) through
//! `tracing`, and optionally sends commands or records the raw log stream to
//! a file.
//!
//! # Usage
//!
//! ```text
//! inspector [OPTIONS]
//!
//! Options:
//!   --url <URL>            Peer to connect to [default: from config, ws://localhost:8765]
//!   --config <FILE>        Config file [default: platform config directory]
//!   --send <COMMAND>       Command to send once connected (repeatable)
//!   --network              Ask the peer to forward its network traffic
//!   --screenshots          Poll the peer for screenshots
//!   --record <FILE>        Record raw log lines until exit and write them to FILE
//!   --no-history           Do not remember the URL in the config file
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable           | Description                         |
//! |--------------------|-------------------------------------|
//! | `INSPECTOR_URL`    | Peer URL                            |
//! | `INSPECTOR_CONFIG` | Config file path                    |
//! | `RUST_LOG`         | Log filter (overrides `log_level`)  |
//!
//! The program runs until Ctrl+C or until the peer disconnects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use inspector_client::application::{CatalogEvent, LogEvent, NetworkEvent, RecordedLog, UiEvent};
use inspector_client::infrastructure::storage::{load_config, load_config_from, save_config, save_config_to};
use inspector_client::{ClientConfig, InspectorSession};
use inspector_core::{event_types, ClientEvent};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote inspector client.
///
/// Streams logs, network requests and UI snapshots from an inspected
/// application and sends it commands.
#[derive(Debug, Parser)]
#[command(name = "inspector", about = "Remote inspector command-line client", version)]
struct Cli {
    /// Peer URL: `ws://` / `wss://` for a socket, `http://` / `https://` for
    /// an embedding host.
    #[arg(long, env = "INSPECTOR_URL")]
    url: Option<String>,

    /// Config file to read and update instead of the platform default.
    #[arg(long, env = "INSPECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Command to send once connected.  May be given several times; commands
    /// are sent in order.
    #[arg(long = "send", value_name = "COMMAND")]
    send: Vec<String>,

    /// Ask the peer to start forwarding network requests.
    #[arg(long)]
    network: bool,

    /// Poll the peer for a screenshot at the configured interval.
    #[arg(long)]
    screenshots: bool,

    /// Record every raw log line and write the recording to this file on exit.
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Do not add the URL to the connection history.
    #[arg(long)]
    no_history: bool,
}

impl Cli {
    /// The URL to connect to: `--url` if given, else the config default.
    fn resolve_url(&self, config: &ClientConfig) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| config.default_url.clone())
    }

    fn load_config(&self) -> anyhow::Result<ClientConfig> {
        match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("loading config from {}", path.display())),
            None => load_config().context("loading config"),
        }
    }

    fn save_config(&self, config: &ClientConfig) -> anyhow::Result<()> {
        match &self.config {
            Some(path) => save_config_to(config, path)
                .with_context(|| format!("saving config to {}", path.display())),
            None => save_config(config).context("saving config"),
        }
    }
}

/// Writes a recording to `path`, one raw line per line.
fn write_recording(path: &Path, recording: &RecordedLog) -> anyhow::Result<()> {
    std::fs::write(path, recording.to_text())
        .with_context(|| format!("writing recording to {}", path.display()))
}

/// Prints observer events through `tracing`.
fn print_events(session: &InspectorSession) {
    session.catalog().events().subscribe_any(|event: &CatalogEvent| {
        let CatalogEvent::CommandsChanged { commands } = event;
        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        info!(count = commands.len(), "peer commands: {}", names.join(", "));
    });
    session.logs().events().subscribe_any(|event: &LogEvent| match event {
        LogEvent::NewModule { module, .. } => info!(module = %module, "new module"),
        LogEvent::NewComponent { component, .. } => info!(component = %component, "new component"),
        LogEvent::NewLogs { entry, .. } => info!(target: "peer", "{}", entry.raw),
    });
    session.network().events().subscribe_any(|event: &NetworkEvent| {
        let NetworkEvent::Update { entries } = event;
        if let Some(entry) = entries.last() {
            info!(
                id = entry.id,
                status = entry.response.status,
                initiator = %entry.request.initiator,
                "{}",
                entry.request.url
            );
        }
    });
    session.ui().events().subscribe_any(|event: &UiEvent| match event {
        UiEvent::Tree { tree } => info!(nodes = tree.len(), "UI tree updated"),
        UiEvent::Screenshot { image } => info!(bytes = image.len(), "screenshot received"),
    });
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the config file is loaded.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins; otherwise the
///    config's `log_level` applies.
/// 3. A session is created, observer events are hooked up for printing, and
///    the peer is connected.
/// 4. Requested commands, network capture, screenshot polling and recording
///    are started.
/// 5. The program waits for Ctrl+C or a disconnect, then writes the
///    recording (if any) and closes the connection.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    let level = config.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let url = cli.resolve_url(&config);
    let session = InspectorSession::new(&config, None);
    print_events(&session);

    // Fires when the peer goes away so the main loop can exit.
    let gone = Arc::new(Notify::new());
    {
        let gone = Arc::clone(&gone);
        session
            .connection()
            .events()
            .subscribe(event_types::DISCONNECTED, move |_: &ClientEvent| gone.notify_one());
    }

    session
        .connect(&url)
        .await
        .with_context(|| format!("connecting to {url}"))?;
    info!(url = %url, session = %session.id(), "connected");

    if !cli.no_history && config.remember_url(&url) {
        if let Err(e) = cli.save_config(&config) {
            warn!("could not update connection history: {e:#}");
        }
    }

    for command in &cli.send {
        session
            .send_command(command)
            .with_context(|| format!("sending {command:?}"))?;
    }
    if cli.network {
        session.network().start();
    }
    let poller = cli
        .screenshots
        .then(|| session.ui().spawn_screen_poller(config.screen_refresh_interval()));
    if cli.record.is_some() {
        session.logs().start_recording();
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        },
        () = gone.notified() => info!("peer disconnected"),
    }

    if let Some(poller) = poller {
        poller.abort();
    }
    if let Some(path) = &cli.record {
        let recording = session.logs().stop_recording();
        write_recording(path, &recording)?;
        info!(lines = recording.len(), path = %path.display(), "recording written");
    }
    session.close();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
