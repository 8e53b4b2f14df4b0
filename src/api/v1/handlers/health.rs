/*
 * Responsibility
 * - GET /health (疎通用)
 * - 認証マーカーなし: filter は一切かからない
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
