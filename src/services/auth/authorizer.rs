use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::principal::Principal;

/// The request a role check is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallScope {
    /// Stable "no scope" marker.
    #[default]
    Unscoped,
    Call(Uuid),
}

impl CallScope {
    /// A scope unique to one call.
    pub fn call() -> Self {
        Self::Call(Uuid::new_v4())
    }

    pub fn is_unscoped(&self) -> bool {
        matches!(self, Self::Unscoped)
    }
}

/// Answers "does `principal` hold `role`".
#[async_trait]
pub trait Authorizer<P: Principal>: Send + Sync {
    async fn authorize(&self, principal: &P, role: &str) -> bool;

    /// Scope-aware variant; defaults to the scope-free check.
    async fn authorize_in(&self, principal: &P, role: &str, _scope: &CallScope) -> bool {
        self.authorize(principal, role).await
    }

    /// Called once the call behind `scope` has finished. Nothing reachable
    /// through that scope is needed afterwards.
    async fn end_call(&self, _scope: &CallScope) {}
}

#[async_trait]
impl<P, A> Authorizer<P> for Arc<A>
where
    P: Principal,
    A: Authorizer<P> + ?Sized,
{
    async fn authorize(&self, principal: &P, role: &str) -> bool {
        (**self).authorize(principal, role).await
    }

    async fn authorize_in(&self, principal: &P, role: &str, scope: &CallScope) -> bool {
        (**self).authorize_in(principal, role, scope).await
    }

    async fn end_call(&self, scope: &CallScope) {
        (**self).end_call(scope).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

#[async_trait]
impl<P: Principal> Authorizer<P> for PermitAll {
    async fn authorize(&self, _principal: &P, _role: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl<P: Principal> Authorizer<P> for DenyAll {
    async fn authorize(&self, _principal: &P, _role: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_authorizers() {
        let p = "alice".to_string();
        let scope = CallScope::call();

        assert!(PermitAll.authorize(&p, "admin").await);
        assert!(PermitAll.authorize_in(&p, "admin", &scope).await);
        assert!(!DenyAll.authorize(&p, "admin").await);
        assert!(!DenyAll.authorize_in(&p, "", &CallScope::Unscoped).await);
    }

    #[tokio::test]
    async fn test_arc_delegates() {
        let authz: Arc<dyn Authorizer<String>> = Arc::new(DenyAll);
        let shared = Arc::new(authz);
        assert!(!shared.authorize(&"bob".to_string(), "user").await);
    }

    #[test]
    fn test_call_scopes_are_distinct() {
        assert_ne!(CallScope::call(), CallScope::call());
        assert!(CallScope::default().is_unscoped());
        assert!(!CallScope::call().is_unscoped());
    }
}
