use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::services::auth::Principal;

use super::AuthCtx;

/// Handler で AuthCtx を受け取るための extractor.
/// Rejects with 401 when no filter installed an identity for this call.
pub struct AuthCtxExtractor<P: Principal>(pub AuthCtx<P>);

impl<S, P> FromRequestParts<S> for AuthCtxExtractor<P>
where
    S: Send + Sync,
    P: Principal,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx<P>>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Identity of a call whose authentication was optional.
///
/// Never rejects. Role checks on an anonymous caller are always denied.
pub struct MaybeAuthCtx<P: Principal>(pub Option<AuthCtx<P>>);

impl<P: Principal> MaybeAuthCtx<P> {
    pub fn principal(&self) -> Option<&P> {
        self.0.as_ref().map(AuthCtx::principal)
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub async fn has_role(&self, role: &str) -> bool {
        match &self.0 {
            Some(ctx) => ctx.has_role(role).await,
            None => false,
        }
    }
}

impl<S, P> FromRequestParts<S> for MaybeAuthCtx<P>
where
    S: Send + Sync,
    P: Principal,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthCtx(parts.extensions.get::<AuthCtx<P>>().cloned()))
    }
}
