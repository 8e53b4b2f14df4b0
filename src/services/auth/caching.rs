use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use super::authorizer::{Authorizer, CallScope};
use super::authz_cache::{AuthorizationCache, AuthorizationContext, MemoryAuthorizationCache};
use super::principal::Principal;

/// How the call scope takes part in cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Key on `(principal, role, scope)`. Decisions are only reused within
    /// one call, or across calls made through the scope-free `authorize`.
    PerCall,
    /// Key on `(principal, role)`. Decisions are reused across calls.
    #[default]
    Shared,
}

impl FromStr for CacheMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" | "per-call" | "percall" => Ok(Self::PerCall),
            "shared" => Ok(Self::Shared),
            _ => Err(()),
        }
    }
}

/// Memoizes a delegate authorizer.
///
/// The lookup, delegate call and store are not atomic: concurrent misses on
/// one key may each reach the delegate. Delegates are expected to be
/// deterministic, so this only costs duplicate work.
pub struct CachingAuthorizer<P: Principal> {
    delegate: Arc<dyn Authorizer<P>>,
    cache: Arc<dyn AuthorizationCache<P>>,
    mode: CacheMode,
}

impl<P: Principal> CachingAuthorizer<P> {
    /// In-memory cache, shared mode.
    pub fn new(delegate: impl Authorizer<P> + 'static) -> Self {
        Self::with_cache(
            Arc::new(delegate),
            Arc::new(MemoryAuthorizationCache::new()),
            CacheMode::default(),
        )
    }

    pub fn with_cache(
        delegate: Arc<dyn Authorizer<P>>,
        cache: Arc<dyn AuthorizationCache<P>>,
        mode: CacheMode,
    ) -> Self {
        Self {
            delegate,
            cache,
            mode,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Drops the cached decision so the next check reaches the delegate.
    pub async fn invalidate(&self, principal: &P, role: &str, scope: &CallScope) {
        let context = self.context(principal, role, scope);
        self.cache.invalidate(&context).await;
    }

    fn context(&self, principal: &P, role: &str, scope: &CallScope) -> AuthorizationContext<P> {
        let scope = match self.mode {
            CacheMode::PerCall => *scope,
            CacheMode::Shared => CallScope::Unscoped,
        };
        AuthorizationContext::new(principal.clone(), role, scope)
    }
}

#[async_trait]
impl<P: Principal> Authorizer<P> for CachingAuthorizer<P> {
    async fn authorize(&self, principal: &P, role: &str) -> bool {
        self.authorize_in(principal, role, &CallScope::Unscoped)
            .await
    }

    async fn authorize_in(&self, principal: &P, role: &str, scope: &CallScope) -> bool {
        let context = self.context(principal, role, scope);
        if let Some(granted) = self.cache.get(&context).await {
            return granted;
        }

        let granted = self.delegate.authorize_in(principal, role, scope).await;
        tracing::debug!(
            principal = ?principal,
            role,
            granted,
            "authorization decision cached"
        );
        self.cache.put(context, granted).await;
        granted
    }

    async fn end_call(&self, scope: &CallScope) {
        // per-call keys are unreachable once the call is over
        if self.mode == CacheMode::PerCall && !scope.is_unscoped() {
            self.cache.release_scope(scope).await;
        }
        self.delegate.end_call(scope).await;
    }
}
