use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::credential::Credential;
use super::principal::Principal;

/// Raised by an authenticator when it cannot tell whether a credential is
/// valid (identity store unreachable, timeout inside the backend, ...).
///
/// Wrong credentials are NOT a failure: they are `Ok(None)`.
#[derive(Debug, Error)]
#[error("authentication backend failure: {message}")]
pub struct AuthenticationFailure {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AuthenticationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validates a credential.
///
/// - `Ok(Some(p))`: authenticated as `p`
/// - `Ok(None)`:    credential present but does not map to a principal
/// - `Err(_)`:      validity could not be determined
#[async_trait]
pub trait Authenticator<P: Principal>: Send + Sync {
    async fn authenticate(&self, credential: &Credential)
    -> Result<Option<P>, AuthenticationFailure>;
}

#[async_trait]
impl<P, A> Authenticator<P> for Arc<A>
where
    P: Principal,
    A: Authenticator<P> + ?Sized,
{
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<P>, AuthenticationFailure> {
        (**self).authenticate(credential).await
    }
}

/// Default authenticator: nothing ever authenticates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

#[async_trait]
impl<P: Principal> Authenticator<P> for RejectAll {
    async fn authenticate(
        &self,
        _credential: &Credential,
    ) -> Result<Option<P>, AuthenticationFailure> {
        Ok(None)
    }
}

/// Adapts a synchronous closure into an [`Authenticator`].
pub struct FnAuthenticator<F>(pub F);

#[async_trait]
impl<P, F> Authenticator<P> for FnAuthenticator<F>
where
    P: Principal,
    F: Fn(&Credential) -> Result<Option<P>, AuthenticationFailure> + Send + Sync,
{
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<P>, AuthenticationFailure> {
        (self.0)(credential)
    }
}
