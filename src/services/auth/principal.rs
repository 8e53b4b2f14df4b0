use std::fmt;
use std::hash::Hash;

use serde::Serialize;

/// Resolved identity produced by a successful authentication.
///
/// Opaque to this crate; it only has to be comparable and hashable because it
/// takes part in authorization cache keys.
pub trait Principal: Clone + fmt::Debug + Eq + Hash + Send + Sync + 'static {}

impl<T> Principal for T where T: Clone + fmt::Debug + Eq + Hash + Send + Sync + 'static {}

/// Named user, the principal type of the bundled service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserPrincipal {
    pub name: String,
}

impl UserPrincipal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for UserPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
