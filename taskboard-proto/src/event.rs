//! Live-update channel wire format.
//!
//! Events travel as JSON text frames over the `/ws` WebSocket. The server is
//! a pure relay: any `taskUpdate` or `resetTasks` frame a client sends is
//! rebroadcast unchanged to every connected client, sender included, whatever
//! its payload looks like ([`peek_kind`] reads only the envelope). The
//! server also emits `taskUpdate` itself after successful HTTP mutations.
//!
//! ```text
//! {"event":"taskUpdate","data":{"id":"alpha","state":"Done"}}
//! {"event":"resetTasks"}
//! {"event":"error","data":{"reason":"..."}}
//! ```

use serde::{Deserialize, Serialize};

use crate::task::TaskUpdate;

/// Errors produced while encoding or decoding an event frame.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The frame is not a valid event.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A message on the live-update channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum BoardEvent {
    /// A task changed (full snapshot, partial fields, or id only).
    TaskUpdate(TaskUpdate),
    /// Every client should drop its cached workflow state.
    ResetTasks,
    /// The server rejected a frame from this connection. Never rebroadcast.
    Error {
        /// Human-readable description.
        reason: String,
    },
}

impl BoardEvent {
    /// The envelope name of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TaskUpdate(_) => EventKind::TaskUpdate,
            Self::ResetTasks => EventKind::ResetTasks,
            Self::Error { .. } => EventKind::Error,
        }
    }
}

/// The `event` name of a frame, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// `taskUpdate`
    TaskUpdate,
    /// `resetTasks`
    ResetTasks,
    /// `error`
    Error,
}

impl EventKind {
    /// Whether the relay fans this event out to every connection.
    #[must_use]
    pub const fn is_broadcastable(self) -> bool {
        matches!(self, Self::TaskUpdate | Self::ResetTasks)
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: EventKind,
}

/// Reads only the `event` name of a frame. The payload is not inspected, so
/// a `taskUpdate` whose data this crate would reject still reports its kind.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the text is not JSON carrying a known
/// `event` name.
pub fn peek_kind(text: &str) -> Result<EventKind, EventError> {
    Ok(serde_json::from_str::<Envelope>(text)?.event)
}

/// Encodes an event into a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if serialization fails.
pub fn encode(event: &BoardEvent) -> Result<String, EventError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes an event from a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the text is not a known event.
pub fn decode(text: &str) -> Result<BoardEvent, EventError> {
    Ok(serde_json::from_str(text)?)
}
