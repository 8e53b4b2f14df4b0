/*
 * Responsibility
 * - GET /me (認証必須): 呼び出し元の identity を返す
 * - GET /greeting (認証任意): 匿名でも 200
 */
use axum::Json;

use crate::{
    api::v1::{
        dto::identity::{GreetingResponse, MeResponse},
        extractors::{AuthCtxExtractor, MaybeAuthCtx},
    },
    services::auth::UserPrincipal,
};

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor<UserPrincipal>) -> Json<MeResponse> {
    Json(MeResponse::from(&ctx))
}

pub async fn greeting(caller: MaybeAuthCtx<UserPrincipal>) -> Json<GreetingResponse> {
    let message = match caller.principal() {
        Some(principal) => format!("hello, {}", principal.name),
        None => "hello, stranger".to_string(),
    };

    Json(GreetingResponse {
        message,
        authenticated: caller.is_authenticated(),
    })
}
