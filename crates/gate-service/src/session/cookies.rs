//! Cookie parsing and `Set-Cookie` rendering.
//!
//! Request cookies are read from every `Cookie` header (`;`-separated pairs).
//! Mutations requested by the identity service are rendered as one
//! `Set-Cookie` header each, using RFC 6265 attribute syntax.

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A cookie as sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCookie {
    pub name: String,
    pub value: String,
}

impl RequestCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[serde(alias = "Strict")]
    Strict,
    #[serde(alias = "Lax")]
    Lax,
    #[serde(alias = "None")]
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of a cookie mutation, in the identity service's wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Lifetime in seconds; zero or negative removes the cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    /// Absolute expiry (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

/// A cookie write requested by the identity service (rotation or removal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub options: CookieOptions,
}

/// Characters allowed in a cookie value and attribute values.
fn is_safe_octets(s: &str) -> bool {
    !s.chars().any(|c| c == ';' || c.is_control())
}

/// Cookie names are RFC 7230 tokens.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\' | b'"' | b'/'
                        | b'[' | b']' | b'?' | b'=' | b'{' | b'}'
                )
        })
}

impl CookieMutation {
    /// True if this mutation deletes the cookie.
    pub fn is_removal(&self) -> bool {
        matches!(self.options.max_age, Some(max_age) if max_age <= 0)
    }

    /// Render as a `Set-Cookie` header value.
    ///
    /// Returns `None` for names, values or attributes that would corrupt the
    /// header (separators, control characters, CR/LF).
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        if !is_token(&self.name) || !is_safe_octets(&self.value) {
            return None;
        }

        let mut rendered = format!("{}={}", self.name, self.value);
        let options = &self.options;

        if let Some(path) = &options.path {
            if !is_safe_octets(path) {
                return None;
            }
            let _ = write!(rendered, "; Path={path}");
        }
        if let Some(domain) = &options.domain {
            if !is_safe_octets(domain) {
                return None;
            }
            let _ = write!(rendered, "; Domain={domain}");
        }
        if let Some(max_age) = options.max_age {
            let _ = write!(rendered, "; Max-Age={max_age}");
        }
        if let Some(expires) = options.expires {
            let at = chrono::DateTime::from_timestamp(expires, 0)?;
            let _ = write!(rendered, "; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT"));
        }
        if options.http_only == Some(true) {
            rendered.push_str("; HttpOnly");
        }
        if options.secure == Some(true) {
            rendered.push_str("; Secure");
        }
        if let Some(same_site) = options.same_site {
            let _ = write!(rendered, "; SameSite={}", same_site.as_str());
        }

        HeaderValue::from_str(&rendered).ok()
    }
}

/// Collect cookies from every `Cookie` header, in order.
pub fn parse_cookie_headers(headers: &HeaderMap) -> Vec<RequestCookie> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(RequestCookie::new(name, value.trim()))
        })
        .collect()
}

/// Render cookies as a single `Cookie` header value.
pub fn render_cookie_header(cookies: &[RequestCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Apply mutations to a request's cookie list so downstream handlers see the
/// rotated session.
pub fn apply_mutations(cookies: &mut Vec<RequestCookie>, mutations: &[CookieMutation]) {
    for mutation in mutations {
        if mutation.is_removal() {
            cookies.retain(|c| c.name != mutation.name);
            continue;
        }

        match cookies.iter_mut().find(|c| c.name == mutation.name) {
            Some(existing) => existing.value.clone_from(&mutation.value),
            None => cookies.push(RequestCookie::new(&mutation.name, &mutation.value)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn mutation(name: &str, value: &str, options: CookieOptions) -> CookieMutation {
        CookieMutation {
            name: name.to_string(),
            value: value.to_string(),
            options,
        }
    }

    #[test]
    fn test_parse_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("sb-access=a1; theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("sb-refresh=r1"));

        let cookies = parse_cookie_headers(&headers);

        assert_eq!(
            cookies,
            vec![
                RequestCookie::new("sb-access", "a1"),
                RequestCookie::new("theme", "dark"),
                RequestCookie::new("sb-refresh", "r1"),
            ]
        );
    }

    #[test]
    fn test_parse_skips_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("novalue; =orphan; ok=1;;"));

        assert_eq!(parse_cookie_headers(&headers), vec![RequestCookie::new("ok", "1")]);
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb=base64-eyJh=="));

        assert_eq!(
            parse_cookie_headers(&headers),
            vec![RequestCookie::new("sb", "base64-eyJh==")]
        );
    }

    #[test]
    fn test_render_cookie_header() {
        let cookies = vec![RequestCookie::new("a", "1"), RequestCookie::new("b", "2")];
        assert_eq!(render_cookie_header(&cookies), "a=1; b=2");
        assert_eq!(render_cookie_header(&[]), "");
    }

    #[test]
    fn test_set_cookie_rendering_with_all_attributes() {
        let m = mutation(
            "sb-auth-token",
            "base64-abc",
            CookieOptions {
                path: Some("/".to_string()),
                domain: Some("example.com".to_string()),
                max_age: Some(3600),
                expires: Some(0),
                http_only: Some(true),
                secure: Some(true),
                same_site: Some(SameSite::Lax),
            },
        );

        assert_eq!(
            m.to_header_value().unwrap(),
            "sb-auth-token=base64-abc; Path=/; Domain=example.com; Max-Age=3600; \
             Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_set_cookie_rendering_minimal() {
        let m = mutation("a", "1", CookieOptions::default());
        assert_eq!(m.to_header_value().unwrap(), "a=1");
    }

    #[test]
    fn test_set_cookie_rejects_header_injection() {
        let bad = [
            mutation("a", "1\r\nSet-Cookie: evil=1", CookieOptions::default()),
            mutation("a", "1; Domain=evil.com", CookieOptions::default()),
            mutation("a b", "1", CookieOptions::default()),
            mutation("", "1", CookieOptions::default()),
            mutation(
                "a",
                "1",
                CookieOptions {
                    path: Some("/; HttpOnly".to_string()),
                    ..CookieOptions::default()
                },
            ),
        ];

        for m in bad {
            assert!(m.to_header_value().is_none(), "{m:?} should be rejected");
        }
    }

    #[test]
    fn test_options_wire_format() {
        let json = r#"{
            "name": "sb-auth-token",
            "value": "",
            "options": {"path": "/", "maxAge": 0, "httpOnly": false, "sameSite": "lax"}
        }"#;

        let m: CookieMutation = serde_json::from_str(json).unwrap();

        assert_eq!(m.options.path.as_deref(), Some("/"));
        assert_eq!(m.options.same_site, Some(SameSite::Lax));
        assert!(m.is_removal());
    }

    #[test]
    fn test_apply_mutations_replaces_adds_and_removes() {
        let mut cookies = vec![
            RequestCookie::new("sb-auth-token", "old"),
            RequestCookie::new("sb-auth-token.1", "chunk"),
            RequestCookie::new("theme", "dark"),
        ];

        apply_mutations(
            &mut cookies,
            &[
                mutation("sb-auth-token", "new", CookieOptions::default()),
                mutation(
                    "sb-auth-token.1",
                    "",
                    CookieOptions {
                        max_age: Some(0),
                        ..CookieOptions::default()
                    },
                ),
                mutation("sb-code-verifier", "v", CookieOptions::default()),
            ],
        );

        assert_eq!(
            cookies,
            vec![
                RequestCookie::new("sb-auth-token", "new"),
                RequestCookie::new("theme", "dark"),
                RequestCookie::new("sb-code-verifier", "v"),
            ]
        );
    }
}
