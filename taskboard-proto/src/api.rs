//! JSON bodies exchanged over the HTTP surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /tasks/{path}/notes`: the full editor contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesBody {
    /// Everything currently in the notes editor, not a diff.
    pub notes: String,
}

/// Body of `POST /tasks/{path}/logStatusChange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeBody {
    /// Previous state label. Not validated.
    pub from: String,
    /// New state label. Not validated.
    pub to: String,
}

/// Generic `{ "success": true }` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Always `true` on a 2xx response.
    pub success: bool,
}

impl SuccessResponse {
    /// The only value a handler ever returns.
    pub const OK: Self = Self { success: true };
}

/// Response of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always `true` on a 2xx response.
    pub success: bool,
    /// File name the upload was stored under.
    pub file: String,
}

/// Response of `GET /check-ip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCheckResponse {
    /// Whether the caller may perform gated operations.
    pub allowed: bool,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable description.
    pub error: String,
}

/// Response of `GET /connected-users`: connection id to caller address.
pub type ConnectedUsers = BTreeMap<String, String>;
