/*
 * Responsibility
 * - RequestFilter: one pre-handler step that may stop the call
 * - axum wiring (from_fn_with_state) for bound filters
 * - end_call: 呼び出し終了時 (キャンセル含む) に call scope を解放
 */
pub mod binding;
pub mod filter;
pub mod suppress;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AuthError;
use crate::services::auth::CallScope;

pub use binding::{BindingResolver, BindingTable, FilterBinding, Operation, Parameter};
pub use filter::{AuthenticationFilter, Builder, BuildError};
pub use suppress::SuppressAbort;

#[async_trait]
pub trait RequestFilter: Send + Sync {
    /// `Ok(())` lets the call through (possibly with extensions installed).
    async fn filter(&self, req: &mut Request<Body>) -> Result<(), AuthError>;

    /// Runs after the response for a call that `filter` let through with
    /// `scope` installed.
    async fn end_call(&self, _scope: &CallScope) {}
}

pub type SharedFilter = Arc<dyn RequestFilter>;

/// Puts `filter` in front of a single route.
pub fn apply<S>(route: MethodRouter<S>, filter: SharedFilter) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(filter, filter_middleware))
}

async fn filter_middleware(
    State(filter): State<SharedFilter>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    filter.filter(&mut req).await?;

    let guard = EndCall {
        scope: req.extensions().get::<CallScope>().copied(),
        filter,
    };
    let response = next.run(req).await;
    guard.finish().await;
    Ok(response)
}

/// Makes sure `end_call` runs even when the call future is dropped early
/// (timeout, client gone).
struct EndCall {
    filter: SharedFilter,
    scope: Option<CallScope>,
}

impl EndCall {
    async fn finish(mut self) {
        if let Some(scope) = self.scope.take() {
            self.filter.end_call(&scope).await;
        }
    }
}

impl Drop for EndCall {
    fn drop(&mut self) {
        let Some(scope) = self.scope.take() else {
            return;
        };
        let filter = self.filter.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { filter.end_call(&scope).await });
        }
    }
}
