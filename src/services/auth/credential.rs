use std::fmt;

/// Caller-supplied secret material.
///
/// Built fresh per request by the extractor and dropped once authentication
/// has finished.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    Basic { username: String, password: String },
    Token { value: String },
}

impl Credential {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn token(value: impl Into<String>) -> Self {
        Self::Token {
            value: value.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Token { .. } => "token",
        }
    }
}

// Secrets never end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Token { .. } => f
                .debug_struct("Token")
                .field("value", &"<redacted>")
                .finish(),
        }
    }
}
