use axum::{response::IntoResponse, Json};

use crate::dto::StatusResponse;

pub async fn status() -> impl IntoResponse {
    Json(StatusResponse::default())
}
