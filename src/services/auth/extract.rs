//! Credential extraction from request headers and query parameters.
//!
//! Every function here is total: a missing or malformed credential comes back
//! as `None`, never as an error. The filter treats both the same way.

use axum::http::{HeaderMap, HeaderName, header};
use base64::{Engine, engine::general_purpose::STANDARD};

use super::credential::Credential;
use super::scheme::Scheme;

pub const ACCESS_TOKEN_PARAM: &str = "access_token";
pub const DEFAULT_COOKIE_NAME: &str = "access_token";
pub const DEFAULT_TOKEN_HEADER: &str = "x-auth-token";

/// Per-scheme extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    Basic,
    Bearer,
    Cookie(String),
    Header(HeaderName),
}

impl Extractor {
    /// Returns `None` for schemes that have no wire format here (`Assertion`).
    pub fn for_scheme(scheme: Scheme, cookie_name: &str, header_name: &HeaderName) -> Option<Self> {
        match scheme {
            Scheme::Basic => Some(Self::Basic),
            Scheme::Bearer => Some(Self::Bearer),
            Scheme::Cookie => Some(Self::Cookie(cookie_name.to_string())),
            Scheme::Header => Some(Self::Header(header_name.clone())),
            Scheme::Assertion => None,
        }
    }

    pub fn extract(&self, headers: &HeaderMap, query: Option<&str>) -> Option<Credential> {
        match self {
            Self::Basic => basic(headers),
            Self::Bearer => bearer(headers, query),
            Self::Cookie(name) => cookie(headers, name),
            Self::Header(name) => custom_header(headers, name),
        }
    }
}

/// `Authorization: Basic <base64(username:password)>`
pub fn basic(headers: &HeaderMap) -> Option<Credential> {
    let value = authorization(headers)?;
    let encoded = strip_scheme(value, Scheme::Basic.id())?;

    let decoded = STANDARD.decode(encoded.trim_end()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    match decoded.split_once(':') {
        Some((username, password)) if !username.is_empty() => {
            Some(Credential::basic(username, password))
        }
        _ => None,
    }
}

/// `Authorization: Bearer <token>`, falling back to `?access_token=<token>`.
pub fn bearer(headers: &HeaderMap, query: Option<&str>) -> Option<Credential> {
    // an empty header token does not shadow the query parameter
    authorization(headers)
        .and_then(|v| strip_scheme(v, Scheme::Bearer.id()))
        .and_then(non_empty_token)
        .or_else(|| {
            query
                .and_then(|q| query_param(q, ACCESS_TOKEN_PARAM))
                .and_then(|token| non_empty_token(&token))
        })
}

pub fn cookie(headers: &HeaderMap, name: &str) -> Option<Credential> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .and_then(|(_, v)| non_empty_token(v.trim().trim_matches('"')))
}

pub fn custom_header(headers: &HeaderMap, name: &HeaderName) -> Option<Credential> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(non_empty_token)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

// Case-insensitive scheme token followed by exactly one space.
fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let n = scheme.len();
    let prefix = value.get(..n)?;
    if !prefix.eq_ignore_ascii_case(scheme) {
        return None;
    }
    value[n..].strip_prefix(' ')
}

fn query_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn non_empty_token(raw: &str) -> Option<Credential> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }
    Some(Credential::token(token))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(
                HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    fn basic_header(raw: &str) -> HeaderMap {
        headers(&[("authorization", &format!("Basic {}", STANDARD.encode(raw)))])
    }

    #[test]
    fn test_basic_round_trip() {
        let pairs = [
            ("alice", "secret"),
            ("bob", ""),
            ("carol", "pass:with:colons"),
            ("dave", " spaced pass "),
            ("émile", "ünïcode"),
        ];
        for (user, pass) in pairs {
            let got = basic(&basic_header(&format!("{user}:{pass}")));
            assert_eq!(got, Some(Credential::basic(user, pass)), "{user}");
        }
    }

    #[test]
    fn test_basic_scheme_is_case_insensitive() {
        let encoded = STANDARD.encode("alice:pw");
        for prefix in ["Basic", "basic", "BASIC"] {
            let map = headers(&[("authorization", &format!("{prefix} {encoded}"))]);
            assert_eq!(basic(&map), Some(Credential::basic("alice", "pw")));
        }
    }

    #[test]
    fn test_basic_malformed_is_absent() {
        assert_eq!(basic(&HeaderMap::new()), None);
        assert_eq!(basic(&headers(&[("authorization", "Basic !!!notbase64!!!")])), None);
        assert_eq!(basic(&headers(&[("authorization", "Basic")])), None);
        assert_eq!(basic(&headers(&[("authorization", "Basicabc")])), None);
        assert_eq!(basic(&headers(&[("authorization", "Bearer abc")])), None);
        // no colon, or colon in first position
        assert_eq!(basic(&basic_header("alice")), None);
        assert_eq!(basic(&basic_header(":secret")), None);
        // not utf-8 after decoding
        let raw = STANDARD.encode([0xff, 0xfe, b':', b'x']);
        assert_eq!(basic(&headers(&[("authorization", &format!("Basic {raw}"))])), None);
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        for value in ["bearer abc", "BEARER abc", "Bearer abc", "Bearer abc  "] {
            let map = headers(&[("authorization", value)]);
            assert_eq!(bearer(&map, None), Some(Credential::token("abc")), "{value}");
        }
    }

    #[test]
    fn test_bearer_query_fallback() {
        let empty = HeaderMap::new();
        assert_eq!(
            bearer(&empty, Some("a=1&access_token=tok%2042")),
            Some(Credential::token("tok 42"))
        );
        assert_eq!(bearer(&empty, Some("a=1")), None);
        assert_eq!(bearer(&empty, None), None);

        // header wins over query
        let map = headers(&[("authorization", "Bearer from-header")]);
        assert_eq!(
            bearer(&map, Some("access_token=from-query")),
            Some(Credential::token("from-header"))
        );

        // a non-bearer Authorization header does not hide the query parameter
        let map = headers(&[("authorization", "Basic abc")]);
        assert_eq!(
            bearer(&map, Some("access_token=q")),
            Some(Credential::token("q"))
        );
    }

    #[test]
    fn test_bearer_empty_token_is_absent() {
        assert_eq!(bearer(&headers(&[("authorization", "Bearer ")]), None), None);
        assert_eq!(bearer(&headers(&[("authorization", "Bearer    ")]), None), None);
        assert_eq!(bearer(&HeaderMap::new(), Some("access_token=")), None);
    }

    #[test]
    fn test_bearer_empty_header_falls_back_to_query() {
        let map = headers(&[("authorization", "Bearer  ")]);
        assert_eq!(
            bearer(&map, Some("access_token=tok-42")),
            Some(Credential::token("tok-42"))
        );
        assert_eq!(bearer(&map, Some("access_token=")), None);
    }

    #[test]
    fn test_cookie() {
        let map = headers(&[("cookie", "theme=dark; access_token=abc ; other=1")]);
        assert_eq!(cookie(&map, "access_token"), Some(Credential::token("abc")));
        assert_eq!(cookie(&map, "session"), None);

        let map = headers(&[("cookie", "a=1"), ("cookie", "session=\"xyz\"")]);
        assert_eq!(cookie(&map, "session"), Some(Credential::token("xyz")));

        let map = headers(&[("cookie", "session=")]);
        assert_eq!(cookie(&map, "session"), None);
    }

    #[test]
    fn test_custom_header() {
        let name = HeaderName::from_static(DEFAULT_TOKEN_HEADER);
        let map = headers(&[("x-auth-token", " abc ")]);
        assert_eq!(custom_header(&map, &name), Some(Credential::token("abc")));
        assert_eq!(custom_header(&HeaderMap::new(), &name), None);
    }

    #[test]
    fn test_dispatch_table() {
        let name = HeaderName::from_static(DEFAULT_TOKEN_HEADER);
        assert_eq!(
            Extractor::for_scheme(Scheme::Basic, DEFAULT_COOKIE_NAME, &name),
            Some(Extractor::Basic)
        );
        assert_eq!(
            Extractor::for_scheme(Scheme::Cookie, "sid", &name),
            Some(Extractor::Cookie("sid".to_string()))
        );
        assert_eq!(
            Extractor::for_scheme(Scheme::Assertion, DEFAULT_COOKIE_NAME, &name),
            None
        );

        let map = headers(&[("authorization", "Bearer t")]);
        assert_eq!(
            Extractor::Bearer.extract(&map, None),
            Some(Credential::token("t"))
        );
        assert_eq!(Extractor::Basic.extract(&map, None), None);
    }
}
