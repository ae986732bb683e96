//! HTTP handlers.
//!
//! Everything below `/tasks/` goes through one wildcard route. A trailing
//! action segment (`notes`, `upload`, `move`, `logStatusChange`) selects the
//! operation; the rest of the path is the task or folder.

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use taskboard_proto::api::{
    ConnectedUsers, IpCheckResponse, NotesBody, StatusChangeBody, SuccessResponse,
    UploadResponse,
};
use taskboard_proto::event::BoardEvent;
use taskboard_proto::task::{TaskRecord, TaskUpdate};

use crate::auth::{Caller, CallerIdentity};
use crate::error::AppError;
use crate::notes::NoteOutcome;
use crate::relay;
use crate::server::AppState;
use crate::store::{Browse, TaskStore};

const ACTION_NOTES: &str = "notes";
const ACTION_UPLOAD: &str = "upload";
const ACTION_MOVE: &str = "move";
const ACTION_STATUS: &str = "logStatusChange";

/// Routes without state applied.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route(
            "/tasks/{*path}",
            get(get_task_path)
                .post(post_task_action)
                .delete(delete_task_action),
        )
        .route("/check-ip", get(check_ip))
        .route("/connected-users", get(connected_users))
        .route("/ws", get(ws_handler))
}

/// Splits `path` into the target and its trailing action, if the last
/// segment is one of `actions`.
fn split_action<'a>(path: &'a str, actions: &[&str]) -> (&'a str, Option<&'a str>) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((target, last)) if actions.contains(&last) => (target, Some(last)),
        _ => (trimmed, None),
    }
}

/// Runs a store call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&TaskStore) -> Result<T, crate::store::StoreError> + Send + 'static,
{
    let store = state.store.clone();
    Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
}

fn authorize(state: &AppState, caller: &CallerIdentity, denied: &str) -> Result<(), AppError> {
    if state.authorizer.is_allowed(caller) {
        Ok(())
    } else {
        tracing::warn!(addr = %caller, "caller not on allow-list");
        Err(AppError::forbidden(denied))
    }
}

/// `GET /tasks`
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskRecord>>, AppError> {
    let tasks = blocking(&state, TaskStore::list_tasks).await?;
    Ok(Json(tasks))
}

/// `GET /tasks/{*path}`: notes text, folder listing, or file bytes.
async fn get_task_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (target, action) = split_action(&path, &[ACTION_NOTES]);
    let target = target.to_string();

    if action.is_some() {
        let notes = blocking(&state, move |s| s.read_notes(&target)).await?;
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            notes,
        )
            .into_response());
    }

    let mime = mime_guess::from_path(&target).first_or_octet_stream();
    match blocking(&state, move |s| s.browse(&target)).await? {
        Browse::Folder(entries) => Ok(Json(entries).into_response()),
        Browse::File(bytes) => Ok((
            [(header::CONTENT_TYPE, mime.essence_str().to_string())],
            Body::from(bytes),
        )
            .into_response()),
    }
}

/// `POST /tasks/{*path}/{action}`
async fn post_task_action(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let (target, action) = split_action(
        &path,
        &[ACTION_NOTES, ACTION_UPLOAD, ACTION_MOVE, ACTION_STATUS],
    );
    let target = TaskStore::normalize_id(target)?;
    match action {
        Some(ACTION_NOTES) => save_notes(state, caller, target, request).await,
        Some(ACTION_UPLOAD) => upload(state, target, request).await,
        Some(ACTION_MOVE) => move_task(state, caller, target).await,
        Some(ACTION_STATUS) => log_status_change(state, caller, target, request).await,
        _ => Err(AppError::not_found(format!("no such action: {path}"))),
    }
}

/// `DELETE /tasks/{*path}/notes`
async fn delete_task_action(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (target, action) = split_action(&path, &[ACTION_NOTES]);
    if action.is_none() {
        return Err(AppError::not_found(format!("no such action: {path}")));
    }
    authorize(&state, &caller, "Your IP address is not allowed to clear notes.")?;
    let task_id = TaskStore::normalize_id(target)?;

    let id = task_id.clone();
    blocking(&state, move |s| s.clear_notes(&id)).await?;
    state
        .relay
        .broadcast(&BoardEvent::TaskUpdate(TaskUpdate::touched(task_id)))
        .await;
    Ok(Json(SuccessResponse::OK).into_response())
}

async fn save_notes(
    state: AppState,
    caller: CallerIdentity,
    task_id: String,
    request: Request,
) -> Result<Response, AppError> {
    let Json(body) = Json::<NotesBody>::from_request(request, &state)
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?;

    let id = task_id.clone();
    let submitter = caller.to_string();
    let outcome = blocking(&state, move |s| s.append_note(&id, &body.notes, &submitter)).await?;
    if matches!(outcome, NoteOutcome::Appended(_)) {
        state
            .relay
            .broadcast(&BoardEvent::TaskUpdate(TaskUpdate::touched(task_id)))
            .await;
    }
    Ok(Json(SuccessResponse::OK).into_response())
}

async fn log_status_change(
    state: AppState,
    caller: CallerIdentity,
    task_id: String,
    request: Request,
) -> Result<Response, AppError> {
    let Json(body) = Json::<StatusChangeBody>::from_request(request, &state)
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?;
    let submitter = caller.to_string();
    blocking(&state, move |s| {
        s.log_status_change(&task_id, &body.from, &body.to, &submitter)
    })
    .await?;
    Ok(Json(SuccessResponse::OK).into_response())
}

async fn upload(state: AppState, folder: String, request: Request) -> Result<Response, AppError> {
    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?;

    let mut overwrite = false;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("file field has no file name"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                file = Some((name, data));
            }
            Some("overwrite") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                overwrite = matches!(value.trim(), "true" | "1" | "on" | "yes");
            }
            _ => {}
        }
    }
    let (file_name, data) = file.ok_or_else(|| AppError::bad_request("No file uploaded."))?;

    let target = folder.clone();
    let stored = blocking(&state, move |s| {
        let staged = s.stage_upload(&data)?;
        s.commit_upload(staged, &target, &file_name, overwrite)
    })
    .await?;

    state
        .relay
        .broadcast(&BoardEvent::TaskUpdate(TaskUpdate::touched(folder)))
        .await;
    Ok(Json(UploadResponse {
        success: true,
        file: stored,
    })
    .into_response())
}

async fn move_task(
    state: AppState,
    caller: CallerIdentity,
    task_id: String,
) -> Result<Response, AppError> {
    authorize(&state, &caller, "Your IP address is not allowed to move tasks.")?;
    let id = task_id.clone();
    blocking(&state, move |s| s.archive(&id)).await?;
    state
        .relay
        .broadcast(&BoardEvent::TaskUpdate(TaskUpdate::moved(task_id)))
        .await;
    Ok(Json(SuccessResponse::OK).into_response())
}

/// `GET /check-ip`
async fn check_ip(State(state): State<AppState>, Caller(caller): Caller) -> Json<IpCheckResponse> {
    Json(IpCheckResponse {
        allowed: state.authorizer.is_allowed(&caller),
    })
}

/// `GET /connected-users`
async fn connected_users(State(state): State<AppState>) -> Json<ConnectedUsers> {
    Json(state.relay.connected_users().await)
}

/// `GET /ws`: upgrades to the live-update channel.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> impl IntoResponse {
    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| relay::handle_socket(socket, relay, caller))
}
