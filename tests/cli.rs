//! Runs the `mirror` binary against a local fake of the remote REST API.

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

const SESSION: &str = "test-session";

// ─── Fake remote ────────────────────────────────────────────────────

struct Remote {
    pages: Vec<(&'static str, &'static str, i64)>,
    children: HashMap<&'static str, Vec<&'static str>>,
    broken: Vec<&'static str>,
}

type Shared = Arc<Remote>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("JSESSIONID={}", SESSION))
        .unwrap_or(false)
}

fn param(q: &HashMap<String, String>, key: &str, default: usize) -> usize {
    q.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

async fn list_content(
    State(remote): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let start = param(&q, "start", 0);
    let limit = param(&q, "limit", 25);
    let results: Vec<_> = remote
        .pages
        .iter()
        .skip(start)
        .take(limit)
        .map(|(id, title, pos)| {
            json!({
                "id": id,
                "type": "page",
                "status": "current",
                "title": title,
                "position": pos,
                "version": {"by": {"username": "editor"}, "when": "2024-05-05T08:00:00.000Z"}
            })
        })
        .collect();
    let size = results.len();
    Json(json!({"results": results, "start": start, "limit": limit, "size": size})).into_response()
}

async fn list_children(
    State(remote): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let start = param(&q, "start", 0);
    let limit = param(&q, "limit", 25);
    let results: Vec<_> = remote
        .children
        .get(id.as_str())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .skip(start)
        .take(limit)
        .map(|c| json!({"id": c, "type": "page"}))
        .collect();
    let size = results.len();
    Json(json!({"results": results, "size": size})).into_response()
}

async fn get_content(
    State(remote): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if remote.broken.iter().any(|b| *b == id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match remote.pages.iter().find(|(pid, _, _)| *pid == id) {
        Some((pid, title, pos)) => Json(json!({
            "id": pid,
            "type": "page",
            "status": "current",
            "title": title,
            "position": pos,
            "body": {"view": {"value": format!(
                "<div class=\"contentLayout2\"><div class=\"columnLayout\"><p>Welcome to <strong>{}</strong>.</p></div></div>",
                title
            )}}
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_remote() -> SocketAddr {
    let mut children = HashMap::new();
    children.insert("2001", vec!["2002", "2003"]);
    let remote = Arc::new(Remote {
        pages: vec![
            ("2001", "Space Home", 0),
            ("2002", "Broken Page", 1),
            ("2003", "Guide: Setup & Use", 2),
        ],
        children,
        broken: vec!["2002"],
    });

    let app = Router::new()
        .route("/rest/api/content", get(list_content))
        .route("/rest/api/content/{id}", get(get_content))
        .route("/rest/api/content/{id}/child/page", get(list_children))
        .with_state(remote);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ─── Helpers ────────────────────────────────────────────────────────

fn write_config(tmp: &TempDir, addr: SocketAddr) -> PathBuf {
    let config = format!(
        r#"[remote]
base_url = "http://{}"

[archive]
root = "{}/archive"

[listing]
page_size = 2

[politeness]
page_delay_min = 0.0
page_delay_max = 0.0
child_delay_min = 0.0
child_delay_max = 0.0
item_delay_min = 0.0
item_delay_max = 0.0
"#,
        addr,
        tmp.path().display()
    );
    let path = tmp.path().join("mirror.toml");
    fs::write(&path, config).unwrap();
    path
}

async fn run_mirror(
    config: &Path,
    args: &[&str],
    session: Option<&str>,
) -> (String, String, bool) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mirror"));
    cmd.arg("--config")
        .arg(config)
        .arg("--progress")
        .arg("off")
        .args(args)
        .env("RUST_LOG", "warn");
    match session {
        Some(s) => cmd.env("MIRROR_SESSION", s),
        None => cmd.env_remove("MIRROR_SESSION"),
    };

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .expect("failed to run mirror binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_then_resync_over_http() {
    let addr = start_remote().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, addr);
    let archive = tmp.path().join("archive");

    let (stdout, stderr, ok) = run_mirror(&config, &["sync", "ARR"], Some(SESSION)).await;
    assert!(ok, "sync failed: {}", stderr);
    assert!(stdout.contains("remote items: 3"), "{}", stdout);
    assert!(stdout.contains("attempted: 3"), "{}", stdout);
    assert!(stdout.contains("saved: 2"), "{}", stdout);
    assert!(stdout.contains("failed: 1"), "{}", stdout);

    let home = fs::read_to_string(archive.join("2001_Space_Home.md")).unwrap();
    assert!(home.ends_with("---\n\nWelcome to **Space Home**."));
    assert!(archive.join("2003_Guide_Setup__Use.md").exists());

    let hierarchy = fs::read_to_string(archive.join("ARR_hierarchy.md")).unwrap();
    assert!(hierarchy.contains(
        "- **Space Home** (ID: 2001, Position: 0, Last modified: 2024-05-05T08:00:00.000Z, Author: editor, Children: [2002, 2003])"
    ));

    // Only the page that failed is planned again.
    let (stdout, _, ok) = run_mirror(&config, &["sync", "ARR"], Some(SESSION)).await;
    assert!(ok);
    assert!(stdout.contains("planned: 1"), "{}", stdout);
    assert!(stdout.contains("saved: 0"), "{}", stdout);

    let (stdout, _, ok) = run_mirror(&config, &["status"], None).await;
    assert!(ok);
    assert!(stdout.contains("archived documents: 2"), "{}", stdout);
    assert!(stdout.contains("ARR"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hierarchy_command_fetches_no_bodies() {
    let addr = start_remote().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, addr);

    let (stdout, stderr, ok) = run_mirror(&config, &["hierarchy", "ARR"], Some(SESSION)).await;
    assert!(ok, "hierarchy failed: {}", stderr);
    assert!(stdout.contains("ok"));

    let archive = tmp.path().join("archive");
    let names: Vec<String> = fs::read_dir(&archive)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["ARR_hierarchy.md".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dry_run_reports_plan() {
    let addr = start_remote().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, addr);

    let (stdout, _, ok) = run_mirror(&config, &["sync", "ARR", "--dry-run"], Some(SESSION)).await;
    assert!(ok);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("would fetch: 3"));
    assert!(!tmp.path().join("archive").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_session_is_reported() {
    let addr = start_remote().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, addr);

    let (_, stderr, ok) = run_mirror(&config, &["sync", "ARR"], None).await;
    assert!(!ok);
    assert!(stderr.contains("MIRROR_SESSION"), "{}", stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_session_halts_sync() {
    let addr = start_remote().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, addr);

    let (_, stderr, ok) = run_mirror(&config, &["sync", "ARR"], Some("expired")).await;
    assert!(!ok);
    assert!(stderr.contains("No pages found"), "{}", stderr);
    assert!(!tmp.path().join("archive").exists());
}
