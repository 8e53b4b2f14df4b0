//! Storage for cached authorization decisions.
//!
//! Entries are written once and only ever removed through `invalidate`, or
//! through `release_scope` once the call they are scoped to has ended.
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::authorizer::CallScope;
use super::principal::Principal;
use crate::services::cache::{CacheClient, CacheError};

/// Cache key: who, which role, on behalf of which call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizationContext<P> {
    pub principal: P,
    pub role: String,
    pub scope: CallScope,
}

impl<P: Principal> AuthorizationContext<P> {
    pub fn new(principal: P, role: impl Into<String>, scope: CallScope) -> Self {
        Self {
            principal,
            role: role.into(),
            scope,
        }
    }
}

#[async_trait]
pub trait AuthorizationCache<P: Principal>: Send + Sync {
    async fn get(&self, context: &AuthorizationContext<P>) -> Option<bool>;

    /// Stores a decision. An existing entry for the same key is left as is.
    async fn put(&self, context: AuthorizationContext<P>, granted: bool);

    async fn invalidate(&self, context: &AuthorizationContext<P>);

    /// Drops every entry keyed on `scope`.
    async fn release_scope(&self, scope: &CallScope);
}

/// Process-local cache without eviction.
pub struct MemoryAuthorizationCache<P: Principal> {
    entries: DashMap<AuthorizationContext<P>, bool>,
}

impl<P: Principal> MemoryAuthorizationCache<P> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Principal> Default for MemoryAuthorizationCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Principal> AuthorizationCache<P> for MemoryAuthorizationCache<P> {
    async fn get(&self, context: &AuthorizationContext<P>) -> Option<bool> {
        self.entries.get(context).map(|e| *e.value())
    }

    async fn put(&self, context: AuthorizationContext<P>, granted: bool) {
        self.entries.entry(context).or_insert(granted);
    }

    async fn invalidate(&self, context: &AuthorizationContext<P>) {
        self.entries.remove(context);
    }

    async fn release_scope(&self, scope: &CallScope) {
        self.entries.retain(|context, _| context.scope != *scope);
    }
}

/// Shared cache on a Valkey/Redis server, entries expire after `ttl`.
///
/// Backend errors are logged and reported as a miss, so the delegate
/// authorizer stays in charge when the cache is down. Keys written for a
/// call scope are remembered locally so `release_scope` can delete them
/// without scanning the server.
pub struct ValkeyAuthorizationCache<P, C: CacheClient> {
    client: Arc<C>,
    prefix: String,
    ttl: Duration,
    scoped_keys: DashMap<Uuid, Vec<String>>,
    _principal: PhantomData<fn() -> P>,
}

impl<P, C> ValkeyAuthorizationCache<P, C>
where
    P: Principal + fmt::Display,
    C: CacheClient,
{
    pub fn new(client: Arc<C>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            ttl,
            scoped_keys: DashMap::new(),
            _principal: PhantomData,
        }
    }

    /// `<prefix>:<base64url(sha256(principal \0 role \0 scope))>`
    pub fn key(&self, context: &AuthorizationContext<P>) -> String {
        let scope = match context.scope {
            CallScope::Unscoped => "-".to_string(),
            CallScope::Call(id) => id.to_string(),
        };

        let mut hasher = Sha256::new();
        hasher.update(context.principal.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(context.role.as_bytes());
        hasher.update([0u8]);
        hasher.update(scope.as_bytes());

        format!("{}:{}", self.prefix, URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    fn log_failure(&self, op: &'static str, err: &CacheError) {
        tracing::warn!(
            backend = self.client.backend_name(),
            op,
            error = %err,
            "authorization cache backend failure"
        );
    }
}

#[async_trait]
impl<P, C> AuthorizationCache<P> for ValkeyAuthorizationCache<P, C>
where
    P: Principal + fmt::Display,
    C: CacheClient,
{
    async fn get(&self, context: &AuthorizationContext<P>) -> Option<bool> {
        let key = self.key(context);
        match self.client.get_string(&key).await {
            Ok(Some(v)) if v == "1" => Some(true),
            Ok(Some(v)) if v == "0" => Some(false),
            Ok(Some(v)) => {
                self.log_failure("get", &CacheError::InvalidValue(v));
                None
            }
            Ok(None) => None,
            Err(err) => {
                self.log_failure("get", &err);
                None
            }
        }
    }

    async fn put(&self, context: AuthorizationContext<P>, granted: bool) {
        let key = self.key(&context);
        let value = if granted { "1" } else { "0" };
        match self
            .client
            .set_if_absent_with_ttl(&key, value, self.ttl)
            .await
        {
            Ok(true) => {
                if let CallScope::Call(id) = context.scope {
                    self.scoped_keys.entry(id).or_default().push(key);
                }
            }
            Ok(false) => {}
            Err(err) => self.log_failure("put", &err),
        }
    }

    async fn invalidate(&self, context: &AuthorizationContext<P>) {
        let key = self.key(context);
        if let Err(err) = self.client.del(&key).await {
            self.log_failure("invalidate", &err);
        }
    }

    async fn release_scope(&self, scope: &CallScope) {
        let CallScope::Call(id) = scope else {
            return;
        };
        let Some((_, keys)) = self.scoped_keys.remove(id) else {
            return;
        };
        // leftovers expire with the ttl
        for key in keys {
            if let Err(err) = self.client.del(&key).await {
                self.log_failure("release_scope", &err);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::services::cache::CacheResult;

    use super::*;
    use crate::services::auth::principal::UserPrincipal;

    /// In-process stand-in for a Valkey server.
    #[derive(Clone, Default)]
    pub(crate) struct FakeClient {
        pub(crate) store: Arc<Mutex<HashMap<String, String>>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl CacheClient for FakeClient {
        fn backend_name(&self) -> &'static str {
            "fake"
        }

        async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
            if self.fail {
                return Err(CacheError::BackendConnection("down".into()));
            }
            Ok(self.store.lock().unwrap().get(key).cloned())
        }

        async fn set_if_absent_with_ttl(
            &self,
            key: &str,
            value: &str,
            _ttl: Duration,
        ) -> CacheResult<bool> {
            if self.fail {
                return Err(CacheError::BackendConnection("down".into()));
            }
            let mut store = self.store.lock().unwrap();
            if store.contains_key(key) {
                return Ok(false);
            }
            store.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        async fn del(&self, key: &str) -> CacheResult<u64> {
            if self.fail {
                return Err(CacheError::BackendConnection("down".into()));
            }
            Ok(self.store.lock().unwrap().remove(key).map_or(0, |_| 1))
        }
    }

    fn ctx(name: &str, role: &str, scope: CallScope) -> AuthorizationContext<UserPrincipal> {
        AuthorizationContext::new(UserPrincipal::new(name), role, scope)
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryAuthorizationCache::new();
        let key = ctx("alice", "admin", CallScope::Unscoped);

        assert_eq!(cache.get(&key).await, None);
        cache.put(key.clone(), true).await;
        assert_eq!(cache.get(&key).await, Some(true));

        // never updated in place
        cache.put(key.clone(), false).await;
        assert_eq!(cache.get(&key).await, Some(true));

        // every field takes part in the key
        assert_eq!(cache.get(&ctx("bob", "admin", CallScope::Unscoped)).await, None);
        assert_eq!(cache.get(&ctx("alice", "user", CallScope::Unscoped)).await, None);
        assert_eq!(cache.get(&ctx("alice", "admin", CallScope::call())).await, None);

        cache.invalidate(&key).await;
        assert_eq!(cache.get(&key).await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_valkey_cache() {
        let client = FakeClient::default();
        let cache = ValkeyAuthorizationCache::new(
            Arc::new(client.clone()),
            "authz",
            Duration::from_secs(60),
        );
        let key = ctx("alice", "admin", CallScope::Unscoped);

        assert_eq!(cache.get(&key).await, None);
        cache.put(key.clone(), false).await;
        assert_eq!(cache.get(&key).await, Some(false));
        cache.put(key.clone(), true).await;
        assert_eq!(cache.get(&key).await, Some(false));
        assert_eq!(client.store.lock().unwrap().len(), 1);

        cache.invalidate(&key).await;
        assert_eq!(cache.get(&key).await, None);
        assert!(client.store.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valkey_cache_failure_is_a_miss() {
        let client = FakeClient {
            fail: true,
            ..FakeClient::default()
        };
        let cache = ValkeyAuthorizationCache::new(Arc::new(client), "authz", Duration::ZERO);
        let key = ctx("alice", "admin", CallScope::Unscoped);

        cache.put(key.clone(), true).await;
        assert_eq!(cache.get(&key).await, None);
        cache.invalidate(&key).await;
    }

    #[tokio::test]
    async fn test_memory_release_scope() {
        let cache = MemoryAuthorizationCache::new();
        let call = CallScope::call();
        let other = CallScope::call();

        cache.put(ctx("alice", "admin", call), true).await;
        cache.put(ctx("alice", "user", call), false).await;
        cache.put(ctx("alice", "admin", other), true).await;
        cache.put(ctx("alice", "admin", CallScope::Unscoped), true).await;
        assert_eq!(cache.len(), 4);

        cache.release_scope(&call).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&ctx("alice", "admin", call)).await, None);
        assert_eq!(cache.get(&ctx("alice", "admin", other)).await, Some(true));
    }

    #[tokio::test]
    async fn test_valkey_release_scope() {
        let client = FakeClient::default();
        let cache = ValkeyAuthorizationCache::new(
            Arc::new(client.clone()),
            "authz",
            Duration::from_secs(60),
        );
        let call = CallScope::call();

        cache.put(ctx("alice", "admin", call), true).await;
        cache.put(ctx("alice", "user", call), false).await;
        cache.put(ctx("alice", "admin", CallScope::Unscoped), true).await;
        assert_eq!(client.store.lock().unwrap().len(), 3);

        cache.release_scope(&call).await;
        assert_eq!(client.store.lock().unwrap().len(), 1);
        assert_eq!(
            cache.get(&ctx("alice", "admin", CallScope::Unscoped)).await,
            Some(true)
        );

        // releasing twice, or the unscoped marker, is a no-op
        cache.release_scope(&call).await;
        cache.release_scope(&CallScope::Unscoped).await;
        assert_eq!(client.store.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_valkey_keys() {
        let cache: ValkeyAuthorizationCache<UserPrincipal, FakeClient> =
            ValkeyAuthorizationCache::new(
                Arc::new(FakeClient::default()),
                "authz",
                Duration::from_secs(1),
            );
        let a = cache.key(&ctx("alice", "admin", CallScope::Unscoped));
        let b = cache.key(&ctx("alice", "admin", CallScope::Unscoped));
        let c = cache.key(&ctx("alice", "admin", CallScope::call()));
        // "a\0b" vs "a" + "b" style collisions
        let d = cache.key(&ctx("alice\0admin", "", CallScope::Unscoped));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("authz:"));
        // sha256 -> 32 bytes -> 43 base64 chars
        assert_eq!(a.len(), "authz:".len() + 43);
        assert_ne!(a, d);
    }
}
