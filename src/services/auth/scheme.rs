use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Credential delivery mechanisms understood by the filter.
///
/// Each variant carries a canonical wire name, which is also what goes out in
/// the `WWW-Authenticate` challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Basic,
    Cookie,
    Bearer,
    Header,
    Assertion,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown authentication scheme: {0}")]
pub struct SchemeError(pub String);

impl Scheme {
    pub const ALL: [Scheme; 5] = [
        Scheme::Basic,
        Scheme::Cookie,
        Scheme::Bearer,
        Scheme::Header,
        Scheme::Assertion,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Scheme::Basic => "Basic",
            Scheme::Cookie => "Cookie",
            Scheme::Bearer => "Bearer",
            Scheme::Header => "Header",
            Scheme::Assertion => "Assertion",
        }
    }

    /// Exact (case-sensitive) lookup by wire name.
    pub fn of(value: &str) -> Result<Self, SchemeError> {
        Self::ALL
            .into_iter()
            .find(|s| s.id() == value)
            .ok_or_else(|| SchemeError(value.to_string()))
    }
}

impl FromStr for Scheme {
    type Err = SchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::of(s)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
