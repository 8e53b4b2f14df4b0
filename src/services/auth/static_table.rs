//! In-memory credential and role tables.
//!
//! These back the bundled service and the tests; a real deployment plugs its
//! identity store in through the same traits.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::authenticator::{AuthenticationFailure, Authenticator};
use super::authorizer::Authorizer;
use super::credential::Credential;
use super::principal::Principal;

/// Maps passwords and tokens to principals.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator<P> {
    passwords: HashMap<String, (String, P)>,
    tokens: HashMap<String, P>,
}

impl<P: Principal> StaticAuthenticator<P> {
    pub fn new() -> Self {
        Self {
            passwords: HashMap::new(),
            tokens: HashMap::new(),
        }
    }

    pub fn with_password(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        principal: P,
    ) -> Self {
        self.passwords
            .insert(username.into(), (password.into(), principal));
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: P) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

impl<P: Principal> Default for StaticAuthenticator<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Principal> Authenticator<P> for StaticAuthenticator<P> {
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<P>, AuthenticationFailure> {
        let principal = match credential {
            Credential::Basic { username, password } => self
                .passwords
                .get(username)
                .filter(|(expected, _)| expected == password)
                .map(|(_, p)| p.clone()),
            Credential::Token { value } => self.tokens.get(value).cloned(),
        };
        Ok(principal)
    }
}

/// Role membership table.
#[derive(Debug, Clone)]
pub struct StaticAuthorizer<P> {
    roles: HashMap<P, HashSet<String>>,
}

impl<P: Principal> StaticAuthorizer<P> {
    pub fn new() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    pub fn grant(mut self, principal: P, role: impl Into<String>) -> Self {
        self.roles.entry(principal).or_default().insert(role.into());
        self
    }
}

impl<P: Principal> Default for StaticAuthorizer<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Principal> Authorizer<P> for StaticAuthorizer<P> {
    async fn authorize(&self, principal: &P, role: &str) -> bool {
        self.roles
            .get(principal)
            .is_some_and(|roles| roles.contains(role))
    }
}
