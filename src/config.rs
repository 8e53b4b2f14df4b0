/*
 * Responsibility
 * - 環境変数の読み込み (PORT, AUTH_* など)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::{CacheMode, Scheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Authorization decision caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSetting {
    Off,
    On(CacheMode),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub request_timeout: Duration,

    pub auth_scheme: Scheme,
    pub auth_realm: Option<String>,
    pub auth_cookie_name: Option<String>,
    pub auth_header_name: Option<String>,

    pub auth_cache: CacheSetting,
    // Valkey URL; in-memory cache when unset
    pub auth_cache_url: Option<String>,
    pub auth_cache_ttl: Duration,

    // name -> password
    pub auth_users: HashMap<String, String>,
    // token -> name
    pub auth_tokens: HashMap<String, String>,
    // name -> roles
    pub auth_roles: HashMap<String, Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let request_timeout = Duration::from_secs(
            std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let auth_scheme = match std::env::var("AUTH_SCHEME") {
            Ok(v) => Scheme::of(v.trim()).map_err(|_| ConfigError::Invalid("AUTH_SCHEME"))?,
            Err(_) => Scheme::Basic,
        };

        let auth_realm = non_empty_var("AUTH_REALM");
        let auth_cookie_name = non_empty_var("AUTH_COOKIE_NAME");
        let auth_header_name = non_empty_var("AUTH_HEADER_NAME");

        let auth_cache = match std::env::var("AUTH_CACHE") {
            Ok(v) => parse_cache_setting(&v).ok_or(ConfigError::Invalid("AUTH_CACHE"))?,
            Err(_) => CacheSetting::On(CacheMode::Shared),
        };

        let auth_cache_url = non_empty_var("AUTH_CACHE_URL");

        let auth_cache_ttl = Duration::from_secs(
            std::env::var("AUTH_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(300),
        );

        let auth_users = parse_pairs(&std::env::var("AUTH_USERS").unwrap_or_default(), ':')
            .ok_or(ConfigError::Invalid("AUTH_USERS"))?;

        let auth_tokens = parse_pairs(&std::env::var("AUTH_TOKENS").unwrap_or_default(), '=')
            .ok_or(ConfigError::Invalid("AUTH_TOKENS"))?;

        let auth_roles = parse_roles(&std::env::var("AUTH_ROLES").unwrap_or_default())
            .ok_or(ConfigError::Invalid("AUTH_ROLES"))?;

        if auth_users.is_empty() && auth_tokens.is_empty() {
            tracing::warn!("AUTH_USERS and AUTH_TOKENS are empty, nobody can authenticate");
        }

        Ok(Self {
            addr,
            app_env,
            request_timeout,
            auth_scheme,
            auth_realm,
            auth_cookie_name,
            auth_header_name,
            auth_cache,
            auth_cache_url,
            auth_cache_ttl,
            auth_users,
            auth_tokens,
            auth_roles,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `off` | `call` | `shared`
pub fn parse_cache_setting(raw: &str) -> Option<CacheSetting> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("off") || raw.eq_ignore_ascii_case("none") {
        return Some(CacheSetting::Off);
    }
    raw.parse::<CacheMode>().ok().map(CacheSetting::On)
}

/// `a<sep>b,c<sep>d` -> {a: b, c: d}. Splits on the first separator only.
pub fn parse_pairs(raw: &str, sep: char) -> Option<HashMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (k, v) = entry.split_once(sep)?;
            let k = k.trim();
            if k.is_empty() {
                return None;
            }
            Some((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

/// `alice=admin|user,bob=user`
pub fn parse_roles(raw: &str) -> Option<HashMap<String, Vec<String>>> {
    let pairs = parse_pairs(raw, '=')?;
    Some(
        pairs
            .into_iter()
            .map(|(name, roles)| {
                let roles = roles
                    .split('|')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect();
                (name, roles)
            })
            .collect(),
    )
}
