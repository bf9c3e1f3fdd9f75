//! Job triggers: provider webhooks and direct start requests.
//!
//! Every trigger is normalized into a start request before reaching the
//! engine, so all three answer the same way.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use bzk_core::ResourceId;
use bzk_core::trigger::{Provider, normalize};
use tracing::debug;

use super::accepted;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::Path;

pub(super) async fn start_direct(
    State(state): State<AppState>,
    Path(project_id): Path<ResourceId>,
    body: Bytes,
) -> Result<Response, ApiError> {
    start(state, project_id, Provider::Direct, body).await
}

pub(super) async fn start_bitbucket(
    State(state): State<AppState>,
    Path(project_id): Path<ResourceId>,
    body: Bytes,
) -> Result<Response, ApiError> {
    start(state, project_id, Provider::Bitbucket, body).await
}

pub(super) async fn start_github(
    State(state): State<AppState>,
    Path(project_id): Path<ResourceId>,
    body: Bytes,
) -> Result<Response, ApiError> {
    start(state, project_id, Provider::Github, body).await
}

async fn start(
    state: AppState,
    project_id: ResourceId,
    provider: Provider,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = normalize(provider, &body)?;
    debug!(project_id = %project_id, provider = %provider, reference = %request.scm_reference, "Trigger received");
    let job = state.engine.start_job(project_id, request).await?;
    Ok(accepted(job))
}
