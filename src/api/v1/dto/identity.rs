/*
 * Responsibility
 * - 認証済み呼び出し元まわりの request/response DTO
 */
use serde::{Deserialize, Serialize};

use crate::api::v1::extractors::AuthCtx;
use crate::services::auth::UserPrincipal;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub name: String,
    pub scheme: &'static str,
    pub secure: bool,
}

impl From<&AuthCtx<UserPrincipal>> for MeResponse {
    fn from(ctx: &AuthCtx<UserPrincipal>) -> Self {
        Self {
            name: ctx.principal().name.clone(),
            scheme: ctx.authentication_scheme(),
            secure: ctx.is_secure(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GreetingResponse {
    pub message: String,
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub role: String,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.role.trim().is_empty() {
            return Err("role is required");
        }
        Ok(())
    }
}
