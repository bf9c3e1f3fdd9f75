//! Job read endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use bzk_core::ResourceId;
use bzk_core::job::Job;
use bzk_db::LogEntry;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Path;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/{id}", get(get_job))
        .route("/{id}/log", get(get_job_log))
}

async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(state.repos.jobs.list_all().await?))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.repos.jobs.get_by_id(id).await?))
}

async fn get_job_log(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let entries = state.repos.logs.list_for_job(id).await?;
    if entries.is_empty() {
        return Err(ApiError::NotFound(format!("no log for job {}", id)));
    }
    Ok(Json(entries))
}

/// Jobs of one project, newest first.
pub(super) async fn list_project_jobs(
    State(state): State<AppState>,
    Path(project_id): Path<ResourceId>,
) -> Result<Json<Vec<Job>>, ApiError> {
    state.repos.projects.get_by_id(project_id).await?;
    Ok(Json(state.repos.jobs.list_by_project(project_id).await?))
}
