//! Image registry endpoints.
//!
//! Image names may contain slashes (`scm/fetch/git`), so the name is taken
//! from the rest of the path.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use bzk_db::Image;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Path;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_images))
        .route("/{*name}", put(set_image))
}

async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<Image>>, ApiError> {
    Ok(Json(state.repos.images.list().await?))
}

/// The request body is the image reference.
async fn set_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    image: String,
) -> Result<StatusCode, ApiError> {
    let image = image.trim();
    if image.is_empty() {
        return Err(ApiError::BadRequest("image is mandatory".to_string()));
    }
    state.repos.images.set(&name, image).await?;
    info!(name = %name, image = %image, "Registered image");
    Ok(StatusCode::NO_CONTENT)
}
