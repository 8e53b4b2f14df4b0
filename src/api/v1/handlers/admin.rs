/*
 * Responsibility
 * - GET /admin: 認証 + role "admin" が必要 (無ければ 403)
 */
use axum::Json;
use serde_json::{Value, json};

use crate::{api::v1::extractors::AuthCtxExtractor, error::AppError, services::auth::UserPrincipal};

pub const ADMIN_ROLE: &str = "admin";

pub async fn admin(
    AuthCtxExtractor(ctx): AuthCtxExtractor<UserPrincipal>,
) -> Result<Json<Value>, AppError> {
    if !ctx.has_role(ADMIN_ROLE).await {
        tracing::debug!(principal = %ctx.principal(), "admin role not held");
        return Err(AppError::Forbidden);
    }

    Ok(Json(json!({ "admin": ctx.principal().name })))
}
