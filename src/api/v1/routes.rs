/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 各 operation の認証マーカー (operations()) を宣言
 * - BindingTable に従って route ごとに filter を適用
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    admin::admin,
    authz::invalidate,
    health::health,
    me::{greeting, me},
};
use crate::middleware::auth::{BindingTable, Operation, Parameter};
use crate::state::AppState;

pub const OP_HEALTH: &str = "health";
pub const OP_ME: &str = "me";
pub const OP_GREETING: &str = "greeting";
pub const OP_ADMIN: &str = "admin";
pub const OP_INVALIDATE: &str = "authz.invalidate";

/// Authentication markers of every v1 operation.
pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new(OP_HEALTH),
        Operation::new(OP_ME).param(Parameter::identity("caller")),
        Operation::new(OP_GREETING).param(Parameter::optional_identity("caller")),
        Operation::new(OP_ADMIN).authenticated(),
        Operation::new(OP_INVALIDATE)
            .authenticated()
            .param(Parameter::identity("caller")),
    ]
}

pub fn routes(bindings: &BindingTable) -> Router<AppState> {
    Router::new()
        .route("/health", bindings.apply(OP_HEALTH, get(health)))
        .route("/me", bindings.apply(OP_ME, get(me)))
        .route("/greeting", bindings.apply(OP_GREETING, get(greeting)))
        .route("/admin", bindings.apply(OP_ADMIN, get(admin)))
        .route(
            "/authz/invalidate",
            bindings.apply(OP_INVALIDATE, post(invalidate)),
        )
}
