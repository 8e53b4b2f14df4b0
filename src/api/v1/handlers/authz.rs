/*
 * Responsibility
 * - POST /authz/invalidate: 呼び出し元の role 判定キャッシュを破棄
 * - 対象は call scope を持たない判定 (per-call の判定は呼び出し終了時に消える)
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::v1::{dto::identity::InvalidateRequest, extractors::AuthCtxExtractor},
    error::AppError,
    services::auth::{CallScope, UserPrincipal},
    state::AppState,
};

pub async fn invalidate(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor<UserPrincipal>,
    Json(req): Json<InvalidateRequest>,
) -> Result<StatusCode, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("INVALID_ROLE", msg))?;

    let Some(authz) = &state.authz else {
        return Err(AppError::bad_request(
            "CACHE_DISABLED",
            "authorization caching is turned off",
        ));
    };

    let role = req.role.trim();
    authz
        .invalidate(ctx.principal(), role, &CallScope::Unscoped)
        .await;

    tracing::info!(
        principal = %ctx.principal(),
        role,
        mode = ?authz.mode(),
        "authorization decision invalidated"
    );
    Ok(StatusCode::NO_CONTENT)
}
