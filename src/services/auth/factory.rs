/// Factory: build the authentication stack from application `Config`.
use std::sync::Arc;

use anyhow::Context;

use crate::config::{CacheSetting, Config};
use crate::middleware::auth::{AuthenticationFilter, SharedFilter};
use crate::services::auth::{
    AuthorizationCache, Authorizer, CachingAuthorizer, MemoryAuthorizationCache,
    StaticAuthenticator, StaticAuthorizer, UserPrincipal, ValkeyAuthorizationCache,
};
use crate::services::cache::ValkeyClient;

const AUTHZ_CACHE_PREFIX: &str = "authz";

pub struct AuthStack {
    pub filter: SharedFilter,
    /// Present unless caching is turned off.
    pub caching: Option<Arc<CachingAuthorizer<UserPrincipal>>>,
}

pub async fn build_auth(config: &Config) -> anyhow::Result<AuthStack> {
    let authenticator = build_authenticator(config);
    let table: Arc<dyn Authorizer<UserPrincipal>> = Arc::new(build_authorizer(config));

    let (authorizer, caching) = match config.auth_cache {
        CacheSetting::Off => (table, None),
        CacheSetting::On(mode) => {
            let cache = build_cache(config).await?;
            let caching = Arc::new(CachingAuthorizer::with_cache(table, cache, mode));
            let shared: Arc<dyn Authorizer<UserPrincipal>> = caching.clone();
            (shared, Some(caching))
        }
    };

    let mut builder = AuthenticationFilter::<UserPrincipal>::builder()
        .scheme(config.auth_scheme)
        .authenticator(authenticator)
        .shared_authorizer(authorizer);

    if let Some(realm) = &config.auth_realm {
        builder = builder.realm(realm.clone());
    }
    if let Some(name) = &config.auth_cookie_name {
        builder = builder.cookie_name(name.clone());
    }
    if let Some(name) = &config.auth_header_name {
        builder = builder.header_name(name.clone());
    }

    let filter = builder.build().context("invalid authentication filter configuration")?;

    tracing::info!(
        scheme = %config.auth_scheme,
        realm = config.auth_realm.as_deref().unwrap_or("-"),
        cache = ?config.auth_cache,
        "authentication filter configured"
    );

    Ok(AuthStack {
        filter: Arc::new(filter),
        caching,
    })
}

fn build_authenticator(config: &Config) -> StaticAuthenticator<UserPrincipal> {
    let with_passwords = config
        .auth_users
        .iter()
        .fold(StaticAuthenticator::new(), |acc, (name, password)| {
            acc.with_password(name.clone(), password.clone(), UserPrincipal::new(name.clone()))
        });

    config
        .auth_tokens
        .iter()
        .fold(with_passwords, |acc, (token, name)| {
            acc.with_token(token.clone(), UserPrincipal::new(name.clone()))
        })
}

fn build_authorizer(config: &Config) -> StaticAuthorizer<UserPrincipal> {
    config
        .auth_roles
        .iter()
        .flat_map(|(name, roles)| roles.iter().map(move |role| (name, role)))
        .fold(StaticAuthorizer::new(), |acc, (name, role)| {
            acc.grant(UserPrincipal::new(name.clone()), role.clone())
        })
}

async fn build_cache(
    config: &Config,
) -> anyhow::Result<Arc<dyn AuthorizationCache<UserPrincipal>>> {
    let Some(url) = &config.auth_cache_url else {
        return Ok(Arc::new(MemoryAuthorizationCache::new()));
    };

    let client = ValkeyClient::new(url)
        .await
        .context("failed to connect to the authorization cache")?;

    Ok(Arc::new(ValkeyAuthorizationCache::new(
        Arc::new(client),
        AUTHZ_CACHE_PREFIX,
        config.auth_cache_ttl,
    )))
}
