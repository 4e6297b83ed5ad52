//! End-to-end pipeline tests: the real dispatcher, worker pool, correlator,
//! and router wired over in-process channel pairs. The HTTP layer is driven
//! through tower's oneshot, so no sockets are involved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use quill_config::CoreConfig;
use quill_core::storage::{
    BigNote, ClassRecord, HistoryEvent, StorageError, UserRecord,
};
use quill_core::{run_core, CoreError, FsStorage, StoragePort};
use quill_edge::app::{create_app, AppConfig};
use quill_edge::{Correlator, EdgeError, EdgeState};
use quill_ipc::{channel, handshake, TaskKind};

/// A StoragePort wrapper that injects latency into class reads, to hold
/// workers inside the Data Access Port on demand.
struct SlowStorage {
    inner: FsStorage,
    class_read_delay: Duration,
}

#[async_trait]
impl StoragePort for SlowStorage {
    async fn get_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        self.inner.get_user_by_name(username).await
    }
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StorageError> {
        self.inner.create_user(username, password_hash).await
    }
    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), StorageError> {
        self.inner.update_password(username, password_hash).await
    }
    async fn list_classes(&self) -> Result<Vec<ClassRecord>, StorageError> {
        self.inner.list_classes().await
    }
    async fn list_classes_for(&self, user_id: u64) -> Result<Vec<ClassRecord>, StorageError> {
        self.inner.list_classes_for(user_id).await
    }
    async fn get_class(&self, id: u64) -> Result<ClassRecord, StorageError> {
        tokio::time::sleep(self.class_read_delay).await;
        self.inner.get_class(id).await
    }
    async fn create_class(
        &self,
        id: Option<u64>,
        owner: u64,
        name: &str,
        description: &str,
    ) -> Result<ClassRecord, StorageError> {
        self.inner.create_class(id, owner, name, description).await
    }
    async fn put_class(
        &self,
        id: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        self.inner.put_class(id, name, description).await
    }
    async fn delete_class(&self, id: u64) -> Result<(), StorageError> {
        self.inner.delete_class(id).await
    }
    async fn get_bignote(&self, class_id: u64) -> Result<Option<BigNote>, StorageError> {
        self.inner.get_bignote(class_id).await
    }
    async fn upsert_bignote(&self, class_id: u64, note: &BigNote) -> Result<(), StorageError> {
        self.inner.upsert_bignote(class_id, note).await
    }
    async fn append_unit(
        &self,
        class_id: u64,
        title: &str,
        content: &str,
    ) -> Result<(BigNote, bool), StorageError> {
        self.inner.append_unit(class_id, title, content).await
    }
    async fn read_history(&self, class_id: u64) -> Result<Vec<HistoryEvent>, StorageError> {
        self.inner.read_history(class_id).await
    }
    async fn append_history(
        &self,
        class_id: u64,
        event: HistoryEvent,
    ) -> Result<(), StorageError> {
        self.inner.append_history(class_id, event).await
    }
}

struct Pipeline {
    app: Router,
    correlator: Arc<Correlator>,
    core: tokio::task::JoinHandle<Result<(), CoreError>>,
    _dir: tempfile::TempDir,
}

async fn start_pipeline(
    workers: usize,
    reply_timeout: Duration,
    class_read_delay: Option<Duration>,
) -> Pipeline {
    let dir = tempfile::tempdir().unwrap();
    let fs = FsStorage::open(dir.path()).await.unwrap();
    let storage: Arc<dyn StoragePort> = match class_read_delay {
        Some(delay) => Arc::new(SlowStorage {
            inner: fs,
            class_read_delay: delay,
        }),
        None => Arc::new(fs),
    };

    let config = CoreConfig {
        workers,
        startup_window_ms: 1_000,
        invalidate_sessions_on_logout: true,
    };

    let (mut e2c_tx, e2c_rx) = channel::boxed_pair(256 * 1024);
    let (c2e_tx, mut c2e_rx) = channel::boxed_pair(256 * 1024);

    let core = tokio::spawn(async move { run_core(e2c_rx, c2e_tx, &config, storage).await });

    handshake::edge_handshake(&mut e2c_tx, &mut c2e_rx, Duration::from_secs(1))
        .await
        .expect("handshake must converge");

    let correlator = Correlator::new(e2c_tx, reply_timeout);
    let _ = correlator.spawn_reader(c2e_rx);

    let app = create_app(
        EdgeState {
            correlator: correlator.clone(),
        },
        AppConfig {
            enable_tracing: false,
        },
    );

    Pipeline {
        app,
        correlator,
        core,
        _dir: dir,
    }
}

async fn request(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}

/// Register + login; returns the bearer token.
async fn login(app: &Router, username: &str) -> String {
    let (status, _) = request(
        app.clone(),
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        app.clone(),
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_class(app: &Router, token: &str) -> u64 {
    let (status, body) = request(
        app.clone(),
        "POST",
        "/api/me/classes",
        Some(token),
        Some(json!({ "name": "Operating Systems" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["classId"].as_u64().unwrap()
}

// S1: handshake, then liveness through the whole pipeline.
#[tokio::test]
async fn s1_handshake_and_ping() {
    let pipeline = start_pipeline(2, Duration::from_secs(5), None).await;

    let started = Instant::now();
    let (status, body) = request(pipeline.app.clone(), "GET", "/ping-core", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong!");
    assert!(started.elapsed() < Duration::from_millis(500));

    // Edge-local ping never touches the core.
    let response = pipeline
        .app
        .clone()
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(&bytes[..], &b"Pong!\n"[..]);
}

// S2: register, login, wrong password.
#[tokio::test]
async fn s2_register_then_login() {
    let pipeline = start_pipeline(2, Duration::from_secs(5), None).await;

    let (status, body) = request(
        pipeline.app.clone(),
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["userId"].as_u64().unwrap() >= 1);

    let (status, body) = request(
        pipeline.app.clone(),
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert!(!body["sessionId"].as_str().unwrap().is_empty());

    let (status, body) = request(
        pipeline.app.clone(),
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

// Malformed JSON is rejected at the edge, before any core traffic.
#[tokio::test]
async fn malformed_json_is_a_local_400() {
    let pipeline = start_pipeline(1, Duration::from_secs(5), None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = pipeline.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

// S3: a sign-in submitted after two slow edits overtakes the queued edit.
#[tokio::test]
async fn s3_priority_overtakes_queued_work() {
    let delay = Duration::from_millis(700);
    let pipeline = start_pipeline(2, Duration::from_secs(10), Some(delay)).await;

    let alice = login(&pipeline.app, "alice").await;
    let class_id = create_class(&pipeline.app, &alice).await;
    let uri = format!("/api/me/classes/{}/bigNote/edit-note", class_id);

    // Two edits occupy both workers (class reads sleep inside the port).
    let busy: Vec<_> = (0..2)
        .map(|_| {
            let app = pipeline.app.clone();
            let uri = uri.clone();
            let token = alice.clone();
            tokio::spawn(async move {
                request(app, "PUT", &uri, Some(&token), Some(json!({ "content": "x" }))).await
            })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A third edit queues, then a login (priority 3 vs 8) queues after it.
    let queued_edit = {
        let app = pipeline.app.clone();
        let uri = uri.clone();
        let token = alice.clone();
        tokio::spawn(async move {
            let result =
                request(app, "PUT", &uri, Some(&token), Some(json!({ "content": "y" }))).await;
            (Instant::now(), result)
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sign_in = {
        let app = pipeline.app.clone();
        tokio::spawn(async move {
            let result = request(
                app.clone(),
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "username": "alice", "password": "secret123" })),
            )
            .await;
            (Instant::now(), result)
        })
    };

    let (edit_done, (edit_status, _)) = queued_edit.await.unwrap();
    let (sign_in_done, (sign_in_status, _)) = sign_in.await.unwrap();
    assert_eq!(edit_status, StatusCode::OK);
    assert_eq!(sign_in_status, StatusCode::OK);
    // The later-submitted sign-in finished first.
    assert!(
        sign_in_done < edit_done,
        "sign-in should overtake the queued edit"
    );

    for handle in busy {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }
}

// S4: with all workers held and the queue full, the next task is rejected
// immediately with 503 "server busy".
#[tokio::test]
async fn s4_admission_drop_is_immediate() {
    let delay = Duration::from_millis(800);
    let pipeline = start_pipeline(2, Duration::from_secs(10), Some(delay)).await;

    let alice = login(&pipeline.app, "alice").await;
    let class_id = create_class(&pipeline.app, &alice).await;
    let uri = format!("/api/me/classes/{}", class_id);

    // Two in-flight reads hold both workers, two more fill the queue.
    let mut held = Vec::new();
    for _ in 0..4 {
        let app = pipeline.app.clone();
        let uri = uri.clone();
        let token = alice.clone();
        held.push(tokio::spawn(async move {
            request(app, "GET", &uri, Some(&token), None).await
        }));
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let started = Instant::now();
    let (status, body) = request(pipeline.app.clone(), "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "server busy");
    // Rejection came from admission control, not from waiting out a task.
    assert!(started.elapsed() < delay);

    for handle in held {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }
}

// S5: a handler deadline expires with 504; the late reply is discarded and
// the pipeline keeps working.
#[tokio::test]
async fn s5_timeout_then_late_reply_is_discarded() {
    let delay = Duration::from_millis(600);
    let pipeline = start_pipeline(1, Duration::from_secs(5), Some(delay)).await;

    let alice = login(&pipeline.app, "alice").await;
    let class_id = create_class(&pipeline.app, &alice).await;

    // Drive the timed request through the correlator with a 100 ms
    // deadline; the HTTP mapping of Timeout to 504 is covered separately.
    let started = Instant::now();
    let err = pipeline
        .correlator
        .call_with_timeout(
            TaskKind::GetClassDetails,
            json!({ "token": alice, "classId": class_id }),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EdgeError::Timeout));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100) && elapsed < delay);

    // No pending entry leaked.
    assert_eq!(pipeline.correlator.pending_len().await, 0);

    // Once the slow read completes its reply is dropped silently; the next
    // request is unaffected.
    tokio::time::sleep(delay + Duration::from_millis(200)).await;
    let (status, body) = request(pipeline.app.clone(), "GET", "/ping-core", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong!");
}

// S6: SYSKILL during in-flight work: handlers finish, the core exits
// cleanly within the grace window.
#[tokio::test]
async fn s6_shutdown_finishes_in_flight_work() {
    let delay = Duration::from_millis(300);
    let pipeline = start_pipeline(2, Duration::from_secs(10), Some(delay)).await;

    let alice = login(&pipeline.app, "alice").await;
    let class_id = create_class(&pipeline.app, &alice).await;
    let uri = format!("/api/me/classes/{}", class_id);

    // Occupy both workers, then kill the core while they're mid-handler.
    let in_flight: Vec<_> = (0..2)
        .map(|_| {
            let app = pipeline.app.clone();
            let uri = uri.clone();
            let token = alice.clone();
            tokio::spawn(async move { request(app, "GET", &uri, Some(&token), None).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    pipeline
        .correlator
        .send_control(TaskKind::Syskill)
        .await
        .unwrap();

    // In-flight handlers complete normally.
    for handle in in_flight {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    // The core drains and exits within the shutdown grace period.
    let result = tokio::time::timeout(Duration::from_secs(2), pipeline.core)
        .await
        .expect("core must exit within 2s")
        .unwrap();
    result.unwrap();

    // After shutdown the edge refuses new pipeline work.
    let (status, _) = request(pipeline.app.clone(), "GET", "/ping-core", None, None).await;
    assert!(
        status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::INTERNAL_SERVER_ERROR,
        "post-shutdown requests must fail fast, got {}",
        status
    );
}

// The whole note flow over the pipeline: upload, edit, details, history,
// export stub.
#[tokio::test]
async fn note_flow_round_trip() {
    let pipeline = start_pipeline(2, Duration::from_secs(5), None).await;

    let alice = login(&pipeline.app, "alice").await;
    let class_id = create_class(&pipeline.app, &alice).await;

    let (status, body) = request(
        pipeline.app.clone(),
        "POST",
        &format!("/api/me/classes/{}/upload-note", class_id),
        Some(&alice),
        Some(json!({ "noteFile": "lecture one", "title": "Week 1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], false);

    let (status, body) = request(
        pipeline.app.clone(),
        "PUT",
        &format!("/api/me/classes/{}/bigNote/edit-note", class_id),
        Some(&alice),
        Some(json!({ "content": "revised", "title": "Week 1 (rev)" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["lastUpdated"].as_str().unwrap().is_empty());

    let (status, body) = request(
        pipeline.app.clone(),
        "GET",
        &format!("/api/me/classes/{}", class_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Week 1 (rev)");
    assert!(body["bigNote"].is_array());

    let (status, body) = request(
        pipeline.app.clone(),
        "GET",
        &format!("/api/me/classes/{}/bigNote/history", class_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let (status, body) = request(
        pipeline.app.clone(),
        "GET",
        &format!("/api/me/classes/{}/bigNote/export?format=PDF", class_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("PDF"));

    // Requests without a token are refused by the core.
    let (status, _) = request(
        pipeline.app.clone(),
        "GET",
        &format!("/api/me/classes/{}", class_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
