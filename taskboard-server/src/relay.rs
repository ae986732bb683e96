//! Live-update relay: connection registry, WebSocket handler, and fan-out.
//!
//! Every connection is registered under a fresh [`ConnectionId`] with the
//! caller's address. Client frames named `taskUpdate` or `resetTasks` are
//! rebroadcast verbatim to every connection, the sender included, without
//! looking at their payload. Nothing is
//! buffered for late joiners.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskboard_proto::api::ConnectedUsers;
use taskboard_proto::event::{self, BoardEvent};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::auth::CallerIdentity;

/// Default maximum accepted text frame size in bytes (64 KB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Identifier of one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocates a new time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Connection {
    caller: CallerIdentity,
    sender: mpsc::UnboundedSender<Message>,
}

/// Shared relay state holding the connection registry.
pub struct RelayState {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    max_frame_size: usize,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates an empty registry with the default frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates an empty registry with a custom frame size limit.
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            max_frame_size,
        }
    }

    /// Registers a connection and returns its id.
    pub async fn register(
        &self,
        caller: CallerIdentity,
        sender: mpsc::UnboundedSender<Message>,
    ) -> ConnectionId {
        let id = ConnectionId::new();
        let mut conns = self.connections.write().await;
        conns.insert(id, Connection { caller, sender });
        id
    }

    /// Removes a connection. Returns whether it was registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        conns.remove(&id).is_some()
    }

    /// Snapshot of connection id to caller address.
    pub async fn connected_users(&self) -> ConnectedUsers {
        let conns = self.connections.read().await;
        conns
            .iter()
            .map(|(id, conn)| (id.to_string(), conn.caller.to_string()))
            .collect()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Encodes an event and sends it to every connection.
    ///
    /// Returns how many connections it was queued for.
    pub async fn broadcast(&self, event: &BoardEvent) -> usize {
        match event::encode(event) {
            Ok(text) => self.broadcast_text(text.into()).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode broadcast event");
                0
            }
        }
    }

    /// Sends an already encoded frame to every connection, unchanged.
    ///
    /// Connections whose writer has gone away are dropped from the registry.
    pub async fn broadcast_text(&self, text: Utf8Bytes) -> usize {
        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let conns = self.connections.read().await;
            for (id, conn) in conns.iter() {
                if conn.sender.send(Message::Text(text.clone())).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }
        if !dead.is_empty() {
            let mut conns = self.connections.write().await;
            for id in dead {
                tracing::debug!(connection_id = %id, "pruning closed connection");
                conns.remove(&id);
            }
        }
        delivered
    }

    /// Sends an event to a single connection. Returns false if it is gone.
    pub async fn send_to(&self, id: ConnectionId, event: &BoardEvent) -> bool {
        let Ok(text) = event::encode(event) else {
            return false;
        };
        let conns = self.connections.read().await;
        conns
            .get(&id)
            .is_some_and(|conn| conn.sender.send(Message::Text(text.into())).is_ok())
    }

    /// Sends a Close frame to every connection.
    pub async fn close_all_connections(&self) {
        let conns = self.connections.read().await;
        for (id, conn) in conns.iter() {
            tracing::info!(connection_id = %id, "sending close frame");
            let _ = conn.sender.send(Message::Close(None));
        }
    }
}

/// Drives one upgraded WebSocket until either side closes.
pub async fn handle_socket(socket: WebSocket, state: Arc<RelayState>, caller: CallerIdentity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let id = state.register(caller, tx).await;
    tracing::info!(connection_id = %id, addr = %caller, "client connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(connection_id = %id, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => handle_text_frame(id, text, &reader_state).await,
                Message::Binary(_) => {
                    reject(&reader_state, id, "binary frames are not supported".to_string())
                        .await;
                }
                Message::Close(_) => {
                    tracing::debug!(connection_id = %id, "received close frame");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    state.unregister(id).await;
    tracing::info!(connection_id = %id, addr = %caller, "client disconnected");
}

/// Rebroadcasts a client frame, or answers the sender with an error event.
async fn handle_text_frame(id: ConnectionId, text: Utf8Bytes, state: &RelayState) {
    let size = text.as_str().len();
    if size > state.max_frame_size {
        tracing::warn!(
            connection_id = %id,
            size,
            max = state.max_frame_size,
            "frame exceeds size limit"
        );
        let reason = format!(
            "frame too large: {size} bytes (max {})",
            state.max_frame_size
        );
        reject(state, id, reason).await;
        return;
    }

    // Only the envelope is checked; payloads pass through untouched.
    match event::peek_kind(text.as_str()) {
        Ok(kind) if kind.is_broadcastable() => {
            let delivered = state.broadcast_text(text).await;
            tracing::debug!(connection_id = %id, ?kind, delivered, "event rebroadcast");
        }
        Ok(_) => {
            reject(state, id, "error events cannot be sent by clients".to_string()).await;
        }
        Err(e) => {
            tracing::warn!(connection_id = %id, error = %e, "undecodable frame");
            reject(state, id, e.to_string()).await;
        }
    }
}

async fn reject(state: &RelayState, id: ConnectionId, reason: String) {
    state.send_to(id, &BoardEvent::Error { reason }).await;
}
