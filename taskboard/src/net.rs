//! Live-update channel wiring for the TUI.
//!
//! Bridges the synchronous TUI event loop with the `/ws` WebSocket. Spawns a
//! reader and a writer task and talks to the main thread over
//! [`NetCommand`] / [`NetEvent`] channels.
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  reader task  ←── /ws
//!                     ─── NetCommand →  writer task  ──→ /ws
//! ```
//!
//! There is no reconnect: when the socket drops the reader reports
//! [`NetEvent::Disconnected`] and exits. Events broadcast while disconnected
//! are lost; the next full refresh repairs the board.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use taskboard_proto::event::{self, BoardEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors establishing the live-update connection.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The server URL is not HTTP(S) or does not parse.
    #[error("invalid server URL {0}")]
    InvalidUrl(String),

    /// The connection attempt timed out.
    #[error("connecting to {0} timed out")]
    Timeout(String),

    /// The WebSocket handshake failed.
    #[error("WebSocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Commands sent from the TUI main loop to the writer task.
#[derive(Debug)]
pub enum NetCommand {
    /// Send an event; the server relays it to every client, us included.
    Publish(BoardEvent),
    /// Close the socket and stop both tasks.
    Shutdown,
}

/// Events delivered to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// An event arrived on the live-update channel.
    Event(BoardEvent),
    /// The connection ended.
    Disconnected(String),
}

/// Derives the live-update URL from the server's HTTP base URL.
///
/// `http://host:3000` becomes `ws://host:3000/ws`, `https` maps to `wss`.
///
/// # Errors
///
/// Returns [`NetError::InvalidUrl`] for unparsable or non-HTTP URLs.
pub fn ws_url(server_url: &str) -> Result<Url, NetError> {
    let invalid = || NetError::InvalidUrl(server_url.to_string());
    let mut url = Url::parse(server_url).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|()| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .push("ws");
    Ok(url)
}

/// Connects to the live-update channel and spawns the reader and writer.
///
/// # Errors
///
/// Returns [`NetError`] if the URL is unusable or the handshake fails.
pub async fn spawn_net(
    server_url: &str,
    channel_capacity: usize,
) -> Result<(mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>), NetError> {
    let url = ws_url(server_url)?;
    let (ws_stream, _response) =
        tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                tracing::warn!(%url, "live-update connect timed out");
                NetError::Timeout(url.to_string())
            })??;
    tracing::info!(%url, "connected to live-update channel");

    let (mut sink, mut stream) = ws_stream.split();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<NetCommand>(channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(channel_capacity);

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                NetCommand::Publish(event) => {
                    let text = match event::encode(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping unencodable event");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        tracing::warn!(error = %e, "live-update send failed");
                        break;
                    }
                }
                NetCommand::Shutdown => {
                    tracing::info!("live-update writer shutting down");
                    let _ = sink.close().await;
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        let reason = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match event::decode(text.as_str()) {
                    Ok(event) => {
                        if evt_tx.send(NetEvent::Event(event)).await.is_err() {
                            // TUI dropped.
                            return;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "ignoring malformed live-update frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map_or_else(
                        || "closed by server".to_string(),
                        |f| f.reason.as_str().to_owned(),
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "connection ended".to_string(),
            }
        };
        tracing::info!(%reason, "live-update channel disconnected");
        let _ = evt_tx.send(NetEvent::Disconnected(reason)).await;
    });

    Ok((cmd_tx, evt_rx))
}
