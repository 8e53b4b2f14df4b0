use async_trait::async_trait;
use axum::{body::Body, http::Request};

use super::{RequestFilter, SharedFilter};
use crate::error::AuthError;
use crate::services::auth::CallScope;

/// Makes a filter optional.
///
/// Rejections of the "respond now" kind (absent or invalid credentials) are
/// dropped and the call continues without an identity. Backend failures
/// still propagate.
pub struct SuppressAbort {
    inner: SharedFilter,
}

impl SuppressAbort {
    pub fn new(inner: SharedFilter) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RequestFilter for SuppressAbort {
    async fn filter(&self, req: &mut Request<Body>) -> Result<(), AuthError> {
        match self.inner.filter(req).await {
            Err(err) if err.is_abort() => {
                tracing::debug!(reason = %err, "optional authentication suppressed");
                Ok(())
            }
            other => other,
        }
    }

    async fn end_call(&self, scope: &CallScope) {
        self.inner.end_call(scope).await;
    }
}
