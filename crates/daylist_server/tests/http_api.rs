use chrono::{DateTime, Duration, TimeZone, Utc};
use daylist_core::{
    InMemoryTaskRepository, ManualClock, NewTask, RepoResult, SqliteTaskRepository, Task, TaskId,
    TaskListQuery, TaskRepository, TaskService,
};
use daylist_server::router;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct TestServer {
    addr: SocketAddr,
    service: TaskService,
    clock: Arc<ManualClock>,
}

async fn spawn_server(repo: Arc<dyn TaskRepository>) -> TestServer {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap(),
    ));
    let service = TaskService::with_clock(repo, clock.clone());
    let app = router(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

    TestServer {
        addr,
        service,
        clock,
    }
}

async fn memory_server() -> TestServer {
    spawn_server(Arc::new(InMemoryTaskRepository::new())).await
}

async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    match body {
        Some(body) => {
            req.push_str("Content-Type: application/json\r\n");
            req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        }
        None => req.push_str("Content-Length: 0\r\n\r\n"),
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, body.to_string())
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|err| panic!("invalid json `{body}`: {err}"))
}

#[tokio::test]
async fn list_is_empty_array_for_new_store() {
    let server = memory_server().await;

    let (status, body) = send(server.addr, "GET", "/api/tasks", None).await;
    assert_eq!(status, 200);
    assert_eq!(json(&body), serde_json::json!([]));
}

#[tokio::test]
async fn create_returns_created_task_with_defaults() {
    let server = memory_server().await;

    let (status, body) = send(
        server.addr,
        "POST",
        "/api/tasks",
        Some(r#"{"title":"valid title"}"#),
    )
    .await;
    assert_eq!(status, 201);
    let task = json(&body);
    assert_eq!(task["title"], "valid title");
    assert_eq!(task["completed"], false);
    assert_eq!(task["isFixed"], false);
    assert_eq!(task["lastReset"], "2024-01-01T23:00:00Z");
    assert!(task["id"].is_i64());
}

#[tokio::test]
async fn create_rejects_invalid_titles_with_first_message() {
    let server = memory_server().await;

    let (status, body) = send(server.addr, "POST", "/api/tasks", Some(r#"{"title":""}"#)).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["message"], "Title is required");

    let long = format!(r#"{{"title":"{}"}}"#, "x".repeat(101));
    let (status, body) = send(server.addr, "POST", "/api/tasks", Some(&long)).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["message"], "Title too long");

    let (status, body) = send(server.addr, "POST", "/api/tasks", Some("{}")).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["message"], "Title is required");

    let (status, body) = send(server.addr, "POST", "/api/tasks", Some("not json")).await;
    assert_eq!(status, 400);
    assert!(json(&body)["message"].is_string());

    let (_, body) = send(server.addr, "GET", "/api/tasks", None).await;
    assert_eq!(json(&body), serde_json::json!([]));
}

#[tokio::test]
async fn patch_toggles_completion() {
    let server = memory_server().await;
    let (_, body) = send(
        server.addr,
        "POST",
        "/api/tasks",
        Some(r#"{"title":"Water plants","isFixed":true}"#),
    )
    .await;
    let id = json(&body)["id"].as_i64().unwrap();

    let (status, body) = send(
        server.addr,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(status, 200);
    let task = json(&body);
    assert_eq!(task["id"], id);
    assert_eq!(task["completed"], true);
    assert_eq!(task["isFixed"], true);
}

#[tokio::test]
async fn patch_requires_boolean_completed() {
    let server = memory_server().await;
    let (_, body) = send(server.addr, "POST", "/api/tasks", Some(r#"{"title":"a"}"#)).await;
    let id = json(&body)["id"].as_i64().unwrap();
    let path = format!("/api/tasks/{id}");

    for payload in [r#"{}"#, r#"{"completed":"yes"}"#, r#"{"completed":1}"#] {
        let (status, body) = send(server.addr, "PATCH", &path, Some(payload)).await;
        assert_eq!(status, 400, "payload {payload}");
        assert_eq!(json(&body)["message"], "Invalid completed status");
    }

    let (status, _) = send(server.addr, "PATCH", &path, None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn patch_unknown_id_is_not_found() {
    let server = memory_server().await;

    for path in ["/api/tasks/999", "/api/tasks/not-a-number"] {
        let (status, body) =
            send(server.addr, "PATCH", path, Some(r#"{"completed":true}"#)).await;
        assert_eq!(status, 404, "{path}");
        assert_eq!(json(&body)["message"], "Task not found");
    }
}

#[tokio::test]
async fn delete_returns_no_content_then_not_found() {
    let server = memory_server().await;
    let (_, body) = send(server.addr, "POST", "/api/tasks", Some(r#"{"title":"tmp"}"#)).await;
    let id = json(&body)["id"].as_i64().unwrap();
    let path = format!("/api/tasks/{id}");

    let (status, body) = send(server.addr, "DELETE", &path, None).await;
    assert_eq!(status, 204);
    assert!(body.is_empty());

    let (status, body) = send(server.addr, "DELETE", &path, None).await;
    assert_eq!(status, 404);
    assert_eq!(json(&body)["message"], "Task not found");

    let (_, body) = send(server.addr, "GET", "/api/tasks", None).await;
    assert_eq!(json(&body), serde_json::json!([]));
}

#[tokio::test]
async fn list_filters_by_kind() {
    let server = memory_server().await;
    send(
        server.addr,
        "POST",
        "/api/tasks",
        Some(r#"{"title":"stretch","isFixed":true}"#),
    )
    .await;
    send(server.addr, "POST", "/api/tasks", Some(r#"{"title":"call bank"}"#)).await;

    let (status, body) = send(server.addr, "GET", "/api/tasks?kind=fixed", None).await;
    assert_eq!(status, 200);
    let fixed = json(&body);
    assert_eq!(fixed.as_array().unwrap().len(), 1);
    assert_eq!(fixed[0]["title"], "stretch");

    let (_, body) = send(server.addr, "GET", "/api/tasks?kind=variable", None).await;
    let variable = json(&body);
    assert_eq!(variable.as_array().unwrap().len(), 1);
    assert_eq!(variable[0]["title"], "call bank");

    let (status, _) = send(server.addr, "GET", "/api/tasks?kind=weekly", None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn sweep_resets_completed_fixed_task_seen_through_api() {
    let repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::open_in_memory().unwrap());
    let server = spawn_server(repo).await;

    let (_, body) = send(
        server.addr,
        "POST",
        "/api/tasks",
        Some(r#"{"title":"Water plants","isFixed":true}"#),
    )
    .await;
    let id = json(&body)["id"].as_i64().unwrap();
    send(
        server.addr,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(r#"{"completed":true}"#),
    )
    .await;

    server.clock.advance(Duration::minutes(65));
    assert_eq!(server.service.sweep().unwrap(), 1);

    let (_, body) = send(server.addr, "GET", "/api/tasks", None).await;
    let tasks = json(&body);
    assert_eq!(tasks[0]["completed"], false);
    assert_eq!(tasks[0]["lastReset"], "2024-01-02T00:00:00Z");
}

#[tokio::test]
async fn health_reports_version() {
    let server = memory_server().await;

    let (status, body) = send(server.addr, "GET", "/api/health", None).await;
    assert_eq!(status, 200);
    let health = json(&body);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], daylist_core::core_version());
}

/// In-memory store whose list call blocks the calling thread.
#[derive(Default)]
struct SlowListRepository {
    inner: InMemoryTaskRepository,
}

impl TaskRepository for SlowListRepository {
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        std::thread::sleep(StdDuration::from_millis(1500));
        self.inner.list_tasks(query)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.inner.get_task(id)
    }

    fn create_task(&self, new_task: &NewTask, now: DateTime<Utc>) -> RepoResult<Task> {
        self.inner.create_task(new_task, now)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task> {
        self.inner.set_completed(id, completed)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<bool> {
        self.inner.delete_task(id)
    }

    fn reset_fixed_tasks(&self, now: DateTime<Utc>) -> RepoResult<usize> {
        self.inner.reset_fixed_tasks(now)
    }
}

#[tokio::test]
async fn blocked_store_call_does_not_stall_other_requests() {
    let server = spawn_server(Arc::new(SlowListRepository::default())).await;

    let slow = tokio::spawn(send(server.addr, "GET", "/api/tasks", None));
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    let started_at = Instant::now();
    let (status, _) = send(server.addr, "GET", "/api/health", None).await;
    assert_eq!(status, 200);
    assert!(
        started_at.elapsed() < StdDuration::from_millis(1000),
        "health waited {:?} behind a blocked store call",
        started_at.elapsed()
    );

    let (status, body) = slow.await.expect("slow request task");
    assert_eq!(status, 200);
    assert_eq!(json(&body), serde_json::json!([]));
}
