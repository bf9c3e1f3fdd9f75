//! Request extractors with JSON rejections.

use axum::extract::FromRequestParts;

use crate::error::ApiError;

/// `axum::extract::Path` whose rejection is an `ApiError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);
