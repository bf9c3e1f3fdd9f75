//! Project registry endpoints.

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode, header};
use bzk_core::ResourceId;
use bzk_core::secret::SecretKind;
use common::{body_json, build_test_app, create_project, get, post_json, send};
use serde_json::json;

#[tokio::test]
async fn create_then_get_project() {
    let t = build_test_app();
    let response = post_json(
        &t.app,
        "/api/v1/project",
        json!({"name": "api", "scm_type": "git", "scm_uri": "git@example.com:acme/api.git"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = body_json(response).await;
    let id = body["id"].as_str().unwrap();
    assert_eq!(location, format!("/api/v1/project/{}", id));

    let fetched = body_json(get(&t.app, &location).await).await;
    assert_eq!(fetched["name"], "api");
    assert_eq!(fetched["scm_uri"], "git@example.com:acme/api.git");

    let list = body_json(get(&t.app, "/api/v1/project").await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let project_id = ResourceId::parse(id).unwrap();
    assert!(t.store.secret(project_id, SecretKind::Crypto).is_some());
}

#[tokio::test]
async fn create_project_validation() {
    let t = build_test_app();

    let response = post_json(&t.app, "/api/v1/project", json!({"name": "api"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "scm_uri is mandatory");

    let response = post_json(
        &t.app,
        "/api/v1/project",
        json!({"name": "api", "scm_type": "svn", "scm_uri": "svn://example.com/api"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    create_project(&t.app, "api").await;
    let response = post_json(
        &t.app,
        "/api/v1/project",
        json!({"name": "api", "scm_type": "git", "scm_uri": "git@example.com:acme/other.git"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_project_is_404() {
    let t = build_test_app();
    let uri = format!("/api/v1/project/{}/config", uuid::Uuid::new_v4());
    let response = get(&t.app, &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn config_keys_set_and_unset() {
    let t = build_test_app();
    let id = create_project(&t.app, "api").await;
    let key_uri = format!("/api/v1/project/{}/config/bzk.cache.dirs", id);
    let config_uri = format!("/api/v1/project/{}/config", id);

    let response = send(&t.app, Method::PUT, &key_uri, "node_modules:vendor").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let config = body_json(get(&t.app, &config_uri).await).await;
    assert_eq!(config, json!({"bzk.cache.dirs": "node_modules:vendor"}));

    let response = send(&t.app, Method::DELETE, &key_uri, Body::empty()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let config = body_json(get(&t.app, &config_uri).await).await;
    assert_eq!(config, json!({}));
}

#[tokio::test]
async fn ssh_key_cannot_be_replaced() {
    let t = build_test_app();
    let id = create_project(&t.app, "api").await;
    let uri = format!("/api/v1/project/{}/key", id);

    let response = send(&t.app, Method::PUT, &uri, "-----BEGIN KEY-----").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&t.app, Method::PUT, &uri, "-----BEGIN OTHER KEY-----").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn images_can_be_registered() {
    let t = build_test_app();
    let response = send(
        &t.app,
        Method::PUT,
        "/api/v1/image/scm/fetch/hg",
        "bazooka/scm-hg:1.0",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let images = body_json(get(&t.app, "/api/v1/image").await).await;
    let names: Vec<&str> = images
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"scm/fetch/hg"));

    let response = send(&t.app, Method::PUT, "/api/v1/image/empty", "  ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
