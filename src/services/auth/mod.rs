pub mod authenticator;
pub mod authorizer;
pub mod authz_cache;
pub mod caching;
pub mod credential;
pub mod extract;
pub mod factory;
pub mod principal;
pub mod scheme;
pub mod static_table;

pub use authenticator::{AuthenticationFailure, Authenticator, FnAuthenticator, RejectAll};
pub use authorizer::{Authorizer, CallScope, DenyAll, PermitAll};
pub use authz_cache::{
    AuthorizationCache, AuthorizationContext, MemoryAuthorizationCache, ValkeyAuthorizationCache,
};
pub use caching::{CacheMode, CachingAuthorizer};
pub use credential::Credential;
pub use extract::Extractor;
pub use principal::{Principal, UserPrincipal};
pub use scheme::{Scheme, SchemeError};
pub use static_table::{StaticAuthenticator, StaticAuthorizer};
