//! Project management endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bzk_core::ResourceId;
use bzk_core::project::{NewProject, Project};
use std::collections::BTreeMap;
use tracing::info;

use super::{jobs, webhooks};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::Path;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/{id}", get(get_project))
        .route("/{id}/config", get(get_config))
        .route("/{id}/config/{key}", put(set_config_key).delete(unset_config_key))
        .route("/{id}/key", put(set_key))
        .route("/{id}/job", get(jobs::list_project_jobs).post(webhooks::start_direct))
        .route("/{id}/bitbucket", post(webhooks::start_bitbucket))
        .route("/{id}/github", post(webhooks::start_github))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.repos.projects.list().await?))
}

async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<NewProject>,
) -> Result<Response, ApiError> {
    let project = state.registry.create(req).await?;
    let location = format!("/api/v1/project/{}", project.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(project)).into_response())
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.repos.projects.get_by_id(id).await?))
}

async fn get_config(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let project = state.repos.projects.get_by_id(id).await?;
    Ok(Json(project.config))
}

/// The request body is the raw value.
async fn set_config_key(
    State(state): State<AppState>,
    Path((id, key)): Path<(ResourceId, String)>,
    value: String,
) -> Result<StatusCode, ApiError> {
    state.repos.projects.set_config_key(id, &key, &value).await?;
    info!(project_id = %id, key = %key, "Set project config key");
    Ok(StatusCode::NO_CONTENT)
}

async fn unset_config_key(
    State(state): State<AppState>,
    Path((id, key)): Path<(ResourceId, String)>,
) -> Result<StatusCode, ApiError> {
    state.repos.projects.unset_config_key(id, &key).await?;
    info!(project_id = %id, key = %key, "Unset project config key");
    Ok(StatusCode::NO_CONTENT)
}

/// The request body is the raw private key.
async fn set_key(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    state.registry.set_ssh_key(id, body.to_vec()).await?;
    Ok(StatusCode::NO_CONTENT)
}
