//! Shared helpers for API tests: an app over in-memory repositories and a
//! recording executor.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response};
use bzk_orchestrator::testing::{FakeExecutor, MemoryStore};
use bzk_orchestrator::{MonitorReport, ORCHESTRATION_IMAGE, OrchestratorSettings};
use bzk_api::{AppState, routes};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub executor: Arc<FakeExecutor>,
    pub reports: mpsc::Receiver<MonitorReport>,
    _home: TempDir,
}

/// App with the orchestration and git fetch images registered.
pub fn build_test_app() -> TestApp {
    let home = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.insert_image(ORCHESTRATION_IMAGE, "bazooka/orchestration");
    store.insert_image("scm/fetch/git", "bazooka/scm-git");

    let executor = FakeExecutor::exiting(0);
    let (tx, reports) = mpsc::channel(16);
    let settings = OrchestratorSettings {
        home: home.path().join("host"),
        local_home: home.path().join("local"),
        docker_sock: "/var/run/docker.sock".to_string(),
        scm_keyfile: None,
        db_addr: "db".to_string(),
        db_port: 5432,
    };
    let state = AppState::new(
        store.repositories(),
        executor.clone(),
        tx,
        CancellationToken::new(),
        settings,
    );

    TestApp {
        app: routes::router(state),
        store,
        executor,
        reports,
        _home: home,
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn post_json(app: &Router, uri: &str, json: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a git project and return its id.
pub async fn create_project(app: &Router, name: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/project",
        serde_json::json!({
            "name": name,
            "scm_type": "git",
            "scm_uri": format!("git@example.com:acme/{}.git", name),
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["id"].as_str().unwrap().to_string()
}
