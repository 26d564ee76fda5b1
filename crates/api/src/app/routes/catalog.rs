use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::app::dto;

/// Static catalog of supported processors (not tenant-specific).
pub async fn list_providers() -> axum::response::Response {
    (StatusCode::OK, Json(dto::catalog_to_json())).into_response()
}
