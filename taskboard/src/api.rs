//! HTTP client for the server's REST surface.
//!
//! Thin `reqwest` wrapper: one method per endpoint, JSON bodies from
//! `taskboard_proto::api`. Non-2xx responses are turned into [`ApiError`],
//! with 403 and 409 split out so callers can react to them (hide gated
//! controls, re-submit an upload with `overwrite`).

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use taskboard_proto::api::{
    ConnectedUsers, ErrorResponse, IpCheckResponse, NotesBody, StatusChangeBody,
    SuccessResponse, UploadResponse,
};
use taskboard_proto::task::{FolderEntry, TaskRecord};
use url::Url;

/// Errors returned by [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured server URL does not parse.
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    /// The configured server URL cannot carry a path (e.g. `mailto:`).
    #[error("server URL cannot be used as a base: {0}")]
    NotABase(String),

    /// The target already exists (upload without overwrite).
    #[error("{0}")]
    Conflict(String),

    /// The caller's address is not on the server's allow-list.
    #[error("{0}")]
    Forbidden(String),

    /// Any other non-2xx response.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The server's error message, or the raw body.
        message: String,
    },
}

/// Client for one Taskboard server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Creates a client for the server at `server_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Url`] or [`ApiError::NotABase`] if the URL is unusable.
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(server_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::NotABase(server_url.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// The server's base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// `GET /tasks`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>, ApiError> {
        let url = self.url(["tasks"])?;
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `GET /tasks/{path}` on a folder.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn list_folder(&self, path: &str) -> Result<Vec<FolderEntry>, ApiError> {
        let url = self.task_url(path, None)?;
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `GET /tasks/{path}` on a file: the raw contents.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.task_url(path, None)?;
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `GET /tasks/{id}/notes`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn read_notes(&self, id: &str) -> Result<String, ApiError> {
        let url = self.task_url(id, Some("notes"))?;
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.text().await?)
    }

    /// `POST /tasks/{id}/notes` with the full editor contents.
    ///
    /// The server appends only the part of `notes` that is not already a
    /// prefix of the stored log.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn append_note(&self, id: &str, notes: &str) -> Result<(), ApiError> {
        let url = self.task_url(id, Some("notes"))?;
        let body = NotesBody {
            notes: notes.to_string(),
        };
        let response = check(self.http.post(url).json(&body).send().await?).await?;
        let _: SuccessResponse = response.json().await?;
        Ok(())
    }

    /// `DELETE /tasks/{id}/notes`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] if this machine may not clear notes.
    pub async fn clear_notes(&self, id: &str) -> Result<(), ApiError> {
        let url = self.task_url(id, Some("notes"))?;
        let response = check(self.http.delete(url).send().await?).await?;
        let _: SuccessResponse = response.json().await?;
        Ok(())
    }

    /// `POST /tasks/{id}/logStatusChange`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn log_status_change(&self, id: &str, from: &str, to: &str) -> Result<(), ApiError> {
        let url = self.task_url(id, Some("logStatusChange"))?;
        let body = StatusChangeBody {
            from: from.to_string(),
            to: to.to_string(),
        };
        let response = check(self.http.post(url).json(&body).send().await?).await?;
        let _: SuccessResponse = response.json().await?;
        Ok(())
    }

    /// `POST /tasks/{folder}/upload` as `multipart/form-data`.
    ///
    /// Returns the file name the server stored the upload under.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] if the file exists and `overwrite` is
    /// false.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        contents: Vec<u8>,
        overwrite: bool,
    ) -> Result<String, ApiError> {
        let url = self.task_url(folder, Some("upload"))?;
        let form = Form::new()
            .part("file", Part::bytes(contents).file_name(file_name.to_string()))
            .text("overwrite", overwrite.to_string());
        let response = check(self.http.post(url).multipart(form).send().await?).await?;
        let body: UploadResponse = response.json().await?;
        Ok(body.file)
    }

    /// `POST /tasks/{id}/move`: archive the task.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] if this machine may not archive tasks.
    pub async fn move_task(&self, id: &str) -> Result<(), ApiError> {
        let url = self.task_url(id, Some("move"))?;
        let response = check(self.http.post(url).send().await?).await?;
        let _: SuccessResponse = response.json().await?;
        Ok(())
    }

    /// `GET /check-ip`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn check_ip(&self) -> Result<bool, ApiError> {
        let url = self.url(["check-ip"])?;
        let response = check(self.http.get(url).send().await?).await?;
        let body: IpCheckResponse = response.json().await?;
        Ok(body.allowed)
    }

    /// `GET /connected-users`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-2xx response.
    pub async fn connected_users(&self) -> Result<ConnectedUsers, ApiError> {
        let url = self.url(["connected-users"])?;
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Appends path segments to the base URL, percent-encoding each.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `/tasks/<path segments>[/<action>]`
    fn task_url(&self, path: &str, action: Option<&str>) -> Result<Url, ApiError> {
        let segments = std::iter::once("tasks")
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .chain(action);
        self.url(segments)
    }
}

/// Passes 2xx responses through and maps everything else to [`ApiError`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body).map_or(body, |e| e.error);
    tracing::debug!(status = status.as_u16(), %message, "request rejected");
    Err(match status {
        StatusCode::FORBIDDEN => ApiError::Forbidden(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    })
}
