//! API routes.

pub mod health;
pub mod images;
pub mod jobs;
pub mod projects;
pub mod webhooks;

use crate::AppState;
use axum::Json;
use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bzk_core::job::Job;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .merge(health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/project", projects::router())
        .nest("/job", jobs::router())
        .nest("/image", images::router())
}

/// `202 Accepted` pointing at the started job.
pub(crate) fn accepted(job: Job) -> Response {
    let location = format!("/api/v1/job/{}", job.id);
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, location)],
        Json(job),
    )
        .into_response()
}
