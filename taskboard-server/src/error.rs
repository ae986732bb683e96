use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskboard_proto::api::ErrorResponse;

use crate::store::StoreError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Every variant renders as
/// `{"error": "..."}` with a matching status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request was malformed (bad multipart body, missing field).
    #[error("{0}")]
    BadRequest(String),

    /// The caller is not on the allow-list.
    #[error("{0}")]
    Forbidden(String),

    /// No handler for the requested action.
    #[error("{0}")]
    NotFound(String),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Construct a 403 Forbidden error for a denied caller.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Construct a 404 Not Found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Status code this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::InvalidPath(_) | StoreError::InvalidFileName(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Io { .. }) | Self::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller. I/O details stay in the server log.
    fn public_message(&self) -> String {
        match self {
            Self::Store(StoreError::Io { context, .. }) => format!("{}.", capitalize(context)),
            Self::Join(_) => "Internal server error.".to_string(),
            other => other.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
