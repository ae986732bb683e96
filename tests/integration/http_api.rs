// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Integration tests for the HTTP surface.
//!
//! Drives the full router with `oneshot`, a temp-dir task tree, and
//! `MockConnectInfo` standing in for the TCP peer address.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::extract::ws::Message;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use taskboard_proto::event::{self, BoardEvent};
use taskboard_proto::task::TaskUpdate;
use taskboard_server::auth::CallerIdentity;
use taskboard_server::server::{AppState, RouterOptions, build_router};
use taskboard_server::store::TaskStore;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

const LOCAL: &str = "127.0.0.1:40000";
const REMOTE: &str = "198.51.100.20:40000";
const BOUNDARY: &str = "taskboard-test-boundary";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    dir: TempDir,
    state: AppState,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"), dir.path().join("done"))
            .with_staging_dir(dir.path().join("staging"));
        fs::create_dir_all(store.tasks_root()).unwrap();
        Self {
            state: AppState::new(store),
            dir,
        }
    }

    fn tasks(&self) -> std::path::PathBuf {
        self.dir.path().join("tasks")
    }

    fn done(&self) -> std::path::PathBuf {
        self.dir.path().join("done")
    }

    fn add_task(&self, id: &str, files: &[(&str, &str)]) {
        let task = self.tasks().join(id);
        fs::create_dir_all(&task).unwrap();
        for (name, content) in files {
            let path = task.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    fn app_from(&self, peer: &str) -> axum::Router {
        build_router(self.state.clone(), &RouterOptions::default())
            .layer(MockConnectInfo(peer.parse::<SocketAddr>().unwrap()))
    }

    fn app(&self) -> axum::Router {
        self.app_from(LOCAL)
    }

    /// Registers a fake live-update connection and returns its receiver.
    async fn listen(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .relay
            .register(CallerIdentity::new("10.9.9.9".parse().unwrap()), tx)
            .await;
        rx
    }
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    (status, String::from_utf8(body).unwrap())
}

async fn request_json(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, body) = send(app, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn multipart_request(uri: &str, file_name: &str, content: &str, overwrite: bool) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
    );
    if overwrite {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"overwrite\"\r\n\r\ntrue\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload(
    app: axum::Router,
    uri: &str,
    file_name: &str,
    content: &str,
    overwrite: bool,
) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, multipart_request(uri, file_name, content, overwrite)).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn next_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> BoardEvent {
    match rx.try_recv().unwrap() {
        Message::Text(text) => event::decode(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

fn file_set(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Listing and browsing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_tasks_returns_sorted_records() {
    let fx = Fixture::new();
    fx.add_task("beta", &[]);
    fx.add_task("alpha", &[]);
    fs::write(fx.tasks().join("loose.txt"), "x").unwrap();

    let (status, json) = get(fx.app(), "/tasks").await;
    assert_eq!(status, StatusCode::OK);
    let tasks = json.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["id"], "alpha");
    assert_eq!(tasks[0]["description"], "alpha");
    assert_eq!(tasks[0]["category"], "Quality Open Projects");
    assert_eq!(tasks[0]["state"], "To Do");
    assert_eq!(tasks[0]["completed"], false);
    assert_eq!(tasks[0]["customState"], 0);
    assert_eq!(tasks[1]["id"], "beta");
}

#[tokio::test]
async fn list_tasks_fails_when_root_is_missing() {
    let fx = Fixture::new();
    fs::remove_dir_all(fx.tasks()).unwrap();
    let (status, json) = get(fx.app(), "/tasks").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Unable to fetch tasks.");
}

#[tokio::test]
async fn folder_listing_is_repeatable() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("brief.txt", "b"), ("drawings/plan.svg", "s")]);

    let (status, first) = get(fx.app(), "/tasks/alpha").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get(fx.app(), "/tasks/alpha").await;
    assert_eq!(first, second);
    assert_eq!(
        first,
        serde_json::json!([
            {"name": "brief.txt", "isFolder": false},
            {"name": "drawings", "isFolder": true},
        ])
    );
}

#[tokio::test]
async fn nested_folder_with_encoded_separator() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("drawings/plan.svg", "s")]);
    let (status, json) = get(fx.app(), "/tasks/alpha%2Fdrawings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["name"], "plan.svg");
}

#[tokio::test]
async fn file_is_served_with_guessed_type() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("brief.txt", "read me")]);
    let req = Request::builder()
        .uri("/tasks/alpha/brief.txt")
        .body(Body::empty())
        .unwrap();
    let response = fx.app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"read me");
}

#[tokio::test]
async fn missing_folder_is_server_error() {
    let fx = Fixture::new();
    let (status, json) = get(fx.app(), "/tasks/ghost").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn traversal_is_bad_request() {
    let fx = Fixture::new();
    let (status, _) = get(fx.app(), "/tasks/..%2F..%2Fetc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notes_append_dedup_and_read() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let mut rx = fx.listen().await;

    let (status, json) = request_json(
        fx.app(),
        "POST",
        "/tasks/alpha/notes",
        Some(serde_json::json!({"notes": "call supplier"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"success": true}));
    assert_eq!(
        next_event(&mut rx),
        BoardEvent::TaskUpdate(TaskUpdate::touched("alpha"))
    );

    let (status, log) = get_text(fx.app(), "/tasks/alpha/notes").await;
    assert_eq!(status, StatusCode::OK);
    assert!(log.ends_with(" - 127.0.0.1: call supplier\n"));

    // Resubmitting the whole log is a no-op and broadcasts nothing.
    let (status, _) = request_json(
        fx.app(),
        "POST",
        "/tasks/alpha/notes",
        Some(serde_json::json!({"notes": log.clone()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(rx.try_recv().is_err());
    let (_, unchanged) = get_text(fx.app(), "/tasks/alpha/notes").await;
    assert_eq!(unchanged, log);

    // Appending a sentence logs exactly that sentence.
    request_json(
        fx.app(),
        "POST",
        "/tasks/alpha/notes",
        Some(serde_json::json!({"notes": format!("{log}order placed")})),
    )
    .await;
    let (_, after) = get_text(fx.app(), "/tasks/alpha/notes").await;
    let added: Vec<_> = after[log.len()..].lines().collect();
    assert_eq!(added.len(), 1);
    assert!(added[0].ends_with(": order placed"));
}

#[tokio::test]
async fn notes_of_task_without_log_are_empty() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let (status, log) = get_text(fx.app(), "/tasks/alpha/notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log, "");
}

#[tokio::test]
async fn notes_submitter_comes_from_forwarded_header() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let req = Request::builder()
        .method("POST")
        .uri("/tasks/alpha/notes")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
        .body(Body::from(r#"{"notes":"via proxy"}"#))
        .unwrap();
    let (status, _) = send(fx.app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let log = fs::read_to_string(fx.tasks().join("alpha/notes.txt")).unwrap();
    assert!(log.contains(" - 203.0.113.5: via proxy"));
}

#[tokio::test]
async fn malformed_notes_body_is_bad_request() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let (status, json) = request_json(
        fx.app(),
        "POST",
        "/tasks/alpha/notes",
        Some(serde_json::json!({"text": "wrong field"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn clear_notes_is_idempotent_for_allowed_callers() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("notes.txt", "old\n")]);

    let (status, json) = request_json(fx.app(), "DELETE", "/tasks/alpha/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(!fx.tasks().join("alpha/notes.txt").exists());

    let (status, _) = request_json(fx.app(), "DELETE", "/tasks/alpha/notes", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn clear_notes_is_forbidden_for_others() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("notes.txt", "keep\n")]);
    let (status, _) =
        request_json(fx.app_from(REMOTE), "DELETE", "/tasks/alpha/notes", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(fx.tasks().join("alpha/notes.txt").exists());
}

#[tokio::test]
async fn status_change_is_logged() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let (status, json) = request_json(
        fx.app(),
        "POST",
        "/tasks/alpha/logStatusChange",
        Some(serde_json::json!({"from": "To Do", "to": "Whatever"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let log = fs::read_to_string(fx.tasks().join("alpha/notes.txt")).unwrap();
    assert!(log.contains("127.0.0.1: Status changed from \"To Do\" to \"Whatever\""));
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_conflict_then_overwrite() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let mut rx = fx.listen().await;

    let (status, json) = upload(fx.app(), "/tasks/alpha/upload", "quote.txt", "v1", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"success": true, "file": "quote.txt"}));
    assert_eq!(
        next_event(&mut rx),
        BoardEvent::TaskUpdate(TaskUpdate::touched("alpha"))
    );

    let (status, json) = upload(fx.app(), "/tasks/alpha/upload", "quote.txt", "v2", false).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("quote.txt"));
    assert_eq!(
        fs::read_to_string(fx.tasks().join("alpha/quote.txt")).unwrap(),
        "v1"
    );
    assert!(rx.try_recv().is_err());

    let (status, _) = upload(fx.app(), "/tasks/alpha/upload", "quote.txt", "v2", true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fs::read_to_string(fx.tasks().join("alpha/quote.txt")).unwrap(),
        "v2"
    );
    assert_eq!(file_set(&fx.dir.path().join("staging")), Vec::<String>::new());
}

#[tokio::test]
async fn upload_strips_directories_from_file_name() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let (status, json) =
        upload(fx.app(), "/tasks/alpha/upload", "../../escape.txt", "x", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"], "escape.txt");
    assert!(fx.tasks().join("alpha/escape.txt").is_file());
}

#[tokio::test]
async fn upload_without_file_is_bad_request() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"overwrite\"\r\n\r\ntrue\r\n--{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/tasks/alpha/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(fx.app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Archive move and access checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_from_unlisted_address_is_forbidden() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("a.txt", "a")]);
    let (status, json) =
        request_json(fx.app_from(REMOTE), "POST", "/tasks/alpha/move", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Your IP address is not allowed to move tasks.");
    assert_eq!(file_set(&fx.tasks().join("alpha")), ["a.txt"]);
    assert!(!fx.done().exists());
}

#[tokio::test]
async fn move_archives_task_and_broadcasts() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[("a.txt", "a"), ("b.txt", "b")]);
    let mut rx = fx.listen().await;

    let (status, json) = request_json(fx.app(), "POST", "/tasks/alpha/move", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(!fx.tasks().join("alpha").exists());
    assert_eq!(file_set(&fx.done().join("alpha")), ["a.txt", "b.txt"]);
    assert_eq!(
        next_event(&mut rx),
        BoardEvent::TaskUpdate(TaskUpdate::moved("alpha"))
    );

    let (_, tasks) = get(fx.app(), "/tasks").await;
    assert_eq!(tasks, serde_json::json!([]));
}

#[tokio::test]
async fn move_of_missing_task_is_server_error() {
    let fx = Fixture::new();
    let (status, _) = request_json(fx.app(), "POST", "/tasks/ghost/move", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn forwarded_header_is_ignored_when_untrusted() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let state = fx.state.clone().with_trust_forwarded_for(false);
    let app = build_router(state, &RouterOptions::default())
        .layer(MockConnectInfo(REMOTE.parse::<SocketAddr>().unwrap()));
    let req = Request::builder()
        .method("POST")
        .uri("/tasks/alpha/move")
        .header("x-forwarded-for", "127.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(fx.tasks().join("alpha").is_dir());
}

#[tokio::test]
async fn check_ip_reports_membership() {
    let fx = Fixture::new();
    let (_, json) = get(fx.app(), "/check-ip").await;
    assert_eq!(json, serde_json::json!({"allowed": true}));
    let (_, json) = get(fx.app_from(REMOTE), "/check-ip").await;
    assert_eq!(json, serde_json::json!({"allowed": false}));
    let (_, json) = get(fx.app_from("[::ffff:127.0.0.1]:1"), "/check-ip").await;
    assert_eq!(json, serde_json::json!({"allowed": true}));
}

#[tokio::test]
async fn connected_users_lists_registry() {
    let fx = Fixture::new();
    let (_, json) = get(fx.app(), "/connected-users").await;
    assert_eq!(json, serde_json::json!({}));

    let _rx = fx.listen().await;
    let (_, json) = get(fx.app(), "/connected-users").await;
    let users = json.as_object().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users.values().next().unwrap(), "10.9.9.9");
}

#[tokio::test]
async fn unknown_action_is_not_found() {
    let fx = Fixture::new();
    fx.add_task("alpha", &[]);
    let (status, _) = request_json(fx.app(), "POST", "/tasks/alpha/explode", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = request_json(fx.app(), "DELETE", "/tasks/alpha", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_files_are_served_from_public_dir() {
    let fx = Fixture::new();
    let public = fx.dir.path().join("public");
    fs::create_dir_all(&public).unwrap();
    fs::write(public.join("index.html"), "<h1>board</h1>").unwrap();

    let options = RouterOptions {
        public_dir: Some(public),
        max_upload_size: None,
    };
    let app = build_router(fx.state.clone(), &options)
        .layer(MockConnectInfo(LOCAL.parse::<SocketAddr>().unwrap()));
    let (status, body) = get_text(app, "/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>board</h1>");
}
