//! Authentication filter: extract → authenticate → install AuthCtx → reject.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, Request},
};
use thiserror::Error;

use super::RequestFilter;
use crate::api::v1::extractors::AuthCtx;
use crate::error::{AuthError, Challenge};
use crate::services::auth::{
    Authenticator, Authorizer, CallScope, Extractor, PermitAll, Principal, RejectAll, Scheme,
    extract::{DEFAULT_COOKIE_NAME, DEFAULT_TOKEN_HEADER},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("authentication scheme {0} has no credential extractor")]
    UnsupportedScheme(Scheme),
    #[error("invalid token header name: {0}")]
    InvalidHeaderName(String),
    #[error("invalid realm label: {0}")]
    InvalidRealm(String),
}

/// Request filter bound to one `(authenticator, authorizer, scheme)` triple.
pub struct AuthenticationFilter<P: Principal> {
    scheme: Scheme,
    extractor: Extractor,
    realm: Option<String>,
    authenticator: Arc<dyn Authenticator<P>>,
    authorizer: Arc<dyn Authorizer<P>>,
}

impl<P: Principal> AuthenticationFilter<P> {
    pub fn builder() -> Builder<P> {
        Builder::new()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator<P>> {
        &self.authenticator
    }

    pub fn authorizer(&self) -> &Arc<dyn Authorizer<P>> {
        &self.authorizer
    }

    fn challenge(&self) -> Challenge {
        Challenge {
            scheme: self.scheme,
            realm: self.realm.clone(),
        }
    }

    /// Runs the filter against a request, installing an [`AuthCtx`] on success.
    pub async fn authenticate(&self, req: &mut Request<Body>) -> Result<(), AuthError> {
        let Some(credential) = self.extractor.extract(req.headers(), req.uri().query()) else {
            tracing::debug!(scheme = %self.scheme, "no usable credentials on request");
            return Err(AuthError::AbsentCredential {
                challenge: self.challenge(),
            });
        };

        let principal = match self.authenticator.authenticate(&credential).await {
            Ok(principal) => principal,
            Err(err) => {
                tracing::warn!(
                    scheme = %self.scheme,
                    error = %err,
                    "authenticator could not validate credentials"
                );
                return Err(AuthError::Infrastructure(err));
            }
        };

        let Some(principal) = principal else {
            tracing::debug!(
                scheme = %self.scheme,
                credential = ?credential,
                "credentials rejected"
            );
            return Err(AuthError::InvalidCredential {
                challenge: self.challenge(),
            });
        };

        let secure = is_secure(req);
        let scope = CallScope::call();
        let ctx = AuthCtx::new(principal, self.scheme, secure, scope, self.authorizer.clone());

        // middleware → extractor への受け渡し
        req.extensions_mut().insert(ctx);
        // scope 単体は end_call 用
        req.extensions_mut().insert(scope);
        Ok(())
    }
}

#[async_trait]
impl<P: Principal> RequestFilter for AuthenticationFilter<P> {
    async fn filter(&self, req: &mut Request<Body>) -> Result<(), AuthError> {
        self.authenticate(req).await
    }

    async fn end_call(&self, scope: &CallScope) {
        self.authorizer.end_call(scope).await;
    }
}

impl<P: Principal> fmt::Debug for AuthenticationFilter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationFilter")
            .field("scheme", &self.scheme)
            .field("extractor", &self.extractor)
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

fn is_secure(req: &Request<Body>) -> bool {
    if req.uri().scheme_str() == Some("https") {
        return true;
    }
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"))
}

/// Configures an [`AuthenticationFilter`].
///
/// Defaults: scheme `Basic`, an authenticator that accepts nobody, and an
/// authorizer that permits every role.
pub struct Builder<P: Principal> {
    scheme: Scheme,
    realm: Option<String>,
    cookie_name: String,
    header_name: String,
    authenticator: Arc<dyn Authenticator<P>>,
    authorizer: Arc<dyn Authorizer<P>>,
    _principal: PhantomData<fn() -> P>,
}

impl<P: Principal> Builder<P> {
    pub fn new() -> Self {
        Self {
            scheme: Scheme::Basic,
            realm: None,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            header_name: DEFAULT_TOKEN_HEADER.to_string(),
            authenticator: Arc::new(RejectAll),
            authorizer: Arc::new(PermitAll),
            _principal: PhantomData,
        }
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Cookie read by the `Cookie` scheme.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Header read by the `Header` scheme.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator<P> + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    pub fn shared_authenticator(mut self, authenticator: Arc<dyn Authenticator<P>>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn authorizer(mut self, authorizer: impl Authorizer<P> + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub fn shared_authorizer(mut self, authorizer: Arc<dyn Authorizer<P>>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn build(self) -> Result<AuthenticationFilter<P>, BuildError> {
        let header_name = HeaderName::from_bytes(self.header_name.to_ascii_lowercase().as_bytes())
            .map_err(|_| BuildError::InvalidHeaderName(self.header_name.clone()))?;

        if let Some(realm) = &self.realm {
            if realm.contains('"') || realm.chars().any(char::is_control) {
                return Err(BuildError::InvalidRealm(realm.clone()));
            }
        }

        let extractor = Extractor::for_scheme(self.scheme, &self.cookie_name, &header_name)
            .ok_or(BuildError::UnsupportedScheme(self.scheme))?;

        Ok(AuthenticationFilter {
            scheme: self.scheme,
            extractor,
            realm: self.realm,
            authenticator: self.authenticator,
            authorizer: self.authorizer,
        })
    }
}

impl<P: Principal> Default for Builder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use base64::{Engine, engine::general_purpose::STANDARD};

    use super::*;
    use crate::services::auth::{
        AuthenticationFailure, Credential, DenyAll, FnAuthenticator, StaticAuthenticator,
        StaticAuthorizer,
    };

    fn request(headers: &[(&str, &str)], uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn basic_filter() -> AuthenticationFilter<String> {
        AuthenticationFilter::builder()
            .authenticator(
                StaticAuthenticator::new().with_password("alice", "pw", "alice".to_string()),
            )
            .authorizer(StaticAuthorizer::new().grant("alice".to_string(), "admin"))
            .realm("api")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let filter = AuthenticationFilter::<String>::builder().build().unwrap();
        assert_eq!(filter.scheme(), Scheme::Basic);
        assert_eq!(filter.realm(), None);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let err = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Assertion)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::UnsupportedScheme(Scheme::Assertion));

        let err = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Header)
            .header_name("bad header")
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::InvalidHeaderName("bad header".into()));

        let err = AuthenticationFilter::<String>::builder()
            .realm("a\"b")
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::InvalidRealm("a\"b".into()));
    }

    #[tokio::test]
    async fn test_default_authenticator_accepts_nobody() {
        let filter = AuthenticationFilter::<String>::builder().build().unwrap();
        let auth = format!("Basic {}", STANDARD.encode("alice:pw"));
        let mut req = request(&[("authorization", &auth)], "/");
        let err = filter.authenticate(&mut req).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential { .. }));
    }

    #[tokio::test]
    async fn test_success_installs_identity() {
        let filter = basic_filter();
        let auth = format!("Basic {}", STANDARD.encode("alice:pw"));
        let mut req = request(&[("authorization", &auth), ("x-forwarded-proto", "https")], "/");

        filter.authenticate(&mut req).await.unwrap();

        let ctx = req.extensions().get::<AuthCtx<String>>().unwrap();
        assert_eq!(ctx.principal(), "alice");
        assert_eq!(ctx.authentication_scheme(), "Basic");
        assert!(ctx.is_secure());
        assert!(!ctx.scope().is_unscoped());
        assert_eq!(req.extensions().get::<CallScope>(), Some(&ctx.scope()));
        assert!(ctx.has_role("admin").await);
        assert!(!ctx.has_role("auditor").await);
    }

    #[tokio::test]
    async fn test_absent_and_malformed_reject_alike() {
        let filter = basic_filter();

        let mut missing = request(&[], "/");
        let mut malformed = request(&[("authorization", "Basic !!!notbase64!!!")], "/");

        let a = filter.authenticate(&mut missing).await.unwrap_err();
        let b = filter.authenticate(&mut malformed).await.unwrap_err();
        assert!(matches!(a, AuthError::AbsentCredential { .. }));
        assert!(matches!(b, AuthError::AbsentCredential { .. }));

        let (a, b) = (a.into_response(), b.into_response());
        assert_eq!(a.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(a.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"api\"");
        assert_eq!(
            a.headers()[header::WWW_AUTHENTICATE],
            b.headers()[header::WWW_AUTHENTICATE]
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthenticated() {
        let filter = basic_filter();
        let auth = format!("Basic {}", STANDARD.encode("alice:nope"));
        let mut req = request(&[("authorization", &auth)], "/");

        let err = filter.authenticate(&mut req).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential { .. }));
        assert!(req.extensions().get::<AuthCtx<String>>().is_none());
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_server_error() {
        let filter = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Bearer)
            .authenticator(FnAuthenticator(|_: &Credential| {
                Err(AuthenticationFailure::new("identity store unreachable"))
            }))
            .build()
            .unwrap();
        let mut req = request(&[("authorization", "Bearer perfectly-fine")], "/");

        let err = filter.authenticate(&mut req).await.unwrap_err();
        assert!(matches!(err, AuthError::Infrastructure(_)));
        assert!(!err.is_abort());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_token_schemes() {
        let tokens = || StaticAuthenticator::new().with_token("t1", "bob".to_string());

        let bearer = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Bearer)
            .authenticator(tokens())
            .authorizer(DenyAll)
            .build()
            .unwrap();
        let mut req = request(&[], "/x?access_token=t1");
        bearer.authenticate(&mut req).await.unwrap();
        let ctx = req.extensions().get::<AuthCtx<String>>().unwrap();
        assert_eq!(ctx.principal(), "bob");
        assert!(!ctx.is_secure());
        assert!(!ctx.has_role("anything").await);

        let cookie = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Cookie)
            .cookie_name("sid")
            .authenticator(tokens())
            .build()
            .unwrap();
        let mut req = request(&[("cookie", "sid=t1")], "/");
        cookie.authenticate(&mut req).await.unwrap();
        assert_eq!(
            req.extensions()
                .get::<AuthCtx<String>>()
                .unwrap()
                .authentication_scheme(),
            "Cookie"
        );

        let custom = AuthenticationFilter::<String>::builder()
            .scheme(Scheme::Header)
            .header_name("X-Api-Key")
            .authenticator(tokens())
            .build()
            .unwrap();
        let mut req = request(&[("x-api-key", "t1")], "/");
        custom.authenticate(&mut req).await.unwrap();
        let mut req = request(&[("authorization", "Bearer t1")], "/");
        let err = custom.authenticate(&mut req).await.unwrap_err();
        assert_eq!(
            err.challenge().map(|c| c.scheme),
            Some(Scheme::Header)
        );
    }
}
