/*
 * Responsibility
 * - The per-call identity installed by the authentication filter
 * - Role checks are answered by the authorizer bound to that filter
 */
use std::fmt;
use std::sync::Arc;

use crate::services::auth::{Authorizer, CallScope, Principal, Scheme};

/// Authenticated caller of one request.
///
/// Lives in the request extensions from the moment the filter accepts the
/// credential until the response is produced.
#[derive(Clone)]
pub struct AuthCtx<P: Principal> {
    principal: P,
    scheme: Scheme,
    secure: bool,
    scope: CallScope,
    authorizer: Arc<dyn Authorizer<P>>,
}

impl<P: Principal> AuthCtx<P> {
    pub fn new(
        principal: P,
        scheme: Scheme,
        secure: bool,
        scope: CallScope,
        authorizer: Arc<dyn Authorizer<P>>,
    ) -> Self {
        Self {
            principal,
            scheme,
            secure,
            scope,
            authorizer,
        }
    }

    pub fn principal(&self) -> &P {
        &self.principal
    }

    /// Wire name of the scheme the caller authenticated with.
    pub fn authentication_scheme(&self) -> &'static str {
        self.scheme.id()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn scope(&self) -> CallScope {
        self.scope
    }

    pub async fn has_role(&self, role: &str) -> bool {
        self.authorizer
            .authorize_in(&self.principal, role, &self.scope)
            .await
    }
}

impl<P: Principal> fmt::Debug for AuthCtx<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCtx")
            .field("principal", &self.principal)
            .field("scheme", &self.scheme)
            .field("secure", &self.secure)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
