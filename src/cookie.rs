//! `Cookie` request header parsing.
//!
//! The parser is a pure function over the raw header value. It keeps the
//! order of the pairs as sent and never fails: malformed segments come back
//! as degenerate pairs (empty key, or no value) that simply match nothing.
//!
//! # Example
//!
//! ```rust
//! use cookie_sessions::cookie::{self, CookiePair};
//!
//! let pairs = cookie::parse(Some("a=1; b=2")).unwrap();
//! assert_eq!(pairs, vec![CookiePair::new("a", "1"), CookiePair::new("b", "2")]);
//! assert_eq!(cookie::find(&pairs, "b"), Some("2"));
//! assert!(cookie::parse(None).is_none());
//! ```

use std::borrow::Cow;

use axum::http::{HeaderMap, Request, header};

/// A single `key=value` segment of a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePair {
    /// Cookie name. Empty when the segment started with `=`.
    pub key: String,
    /// Cookie value. `None` when the segment had no `=` at all.
    pub value: Option<String>,
}

impl CookiePair {
    /// Create a pair with a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    fn from_segment(segment: &str) -> Self {
        match segment.split_once('=') {
            Some((key, value)) => Self {
                key: key.trim().to_string(),
                value: Some(value.trim().to_string()),
            },
            None => Self {
                key: segment.trim().to_string(),
                value: None,
            },
        }
    }
}

/// Parse a raw `Cookie` header value.
///
/// Returns `None` when the header is missing, which is distinct from a header
/// that is present but carries no cookies (`Some(vec![])`).
#[must_use]
pub fn parse(raw: Option<&str>) -> Option<Vec<CookiePair>> {
    let raw = raw?;
    Some(
        raw.split(';')
            .filter(|segment| !segment.trim().is_empty())
            .map(CookiePair::from_segment)
            .collect(),
    )
}

/// Value of the first cookie named `name` that carries a value.
#[must_use]
pub fn find<'a>(pairs: &'a [CookiePair], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .filter(|pair| pair.key == name)
        .find_map(|pair| pair.value.as_deref())
}

/// Read-only access to the `Cookie` header of an incoming request.
pub trait CookieSource {
    /// The raw header value, or `None` if the request carried no cookies.
    fn cookie_header(&self) -> Option<Cow<'_, str>>;
}

impl CookieSource for HeaderMap {
    fn cookie_header(&self) -> Option<Cow<'_, str>> {
        // HTTP/2 clients may split cookies across several header lines.
        let mut values = self
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());

        let first = values.next()?;
        match values.next() {
            None => Some(Cow::Borrowed(first)),
            Some(second) => {
                let mut joined = format!("{first}; {second}");
                for rest in values {
                    joined.push_str("; ");
                    joined.push_str(rest);
                }
                Some(Cow::Owned(joined))
            }
        }
    }
}

impl<B> CookieSource for Request<B> {
    fn cookie_header(&self) -> Option<Cow<'_, str>> {
        self.headers().cookie_header()
    }
}

impl CookieSource for Option<&str> {
    fn cookie_header(&self) -> Option<Cow<'_, str>> {
        self.map(Cow::Borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_preserves_order() {
        let pairs = parse(Some("a=1; b=2")).unwrap();
        assert_eq!(pairs, vec![CookiePair::new("a", "1"), CookiePair::new("b", "2")]);
    }

    #[test]
    fn test_parse_missing_header() {
        assert!(parse(None).is_none());
    }

    #[test]
    fn test_parse_empty_header_is_empty_list() {
        assert_eq!(parse(Some("")), Some(vec![]));
        assert_eq!(parse(Some(" ; ;")), Some(vec![]));
    }

    #[test]
    fn test_parse_splits_on_first_equals_only() {
        let pairs = parse(Some("token=abc==; id=x=y")).unwrap();
        assert_eq!(pairs[0], CookiePair::new("token", "abc=="));
        assert_eq!(pairs[1], CookiePair::new("id", "x=y"));
    }

    #[test]
    fn test_parse_degenerate_segments() {
        let pairs = parse(Some("novalue; =orphan")).unwrap();
        assert_eq!(
            pairs[0],
            CookiePair {
                key: "novalue".to_string(),
                value: None,
            }
        );
        assert_eq!(pairs[1], CookiePair::new("", "orphan"));
    }

    #[test]
    fn test_find_by_name() {
        let pairs = parse(Some("theme=dark; id=abc123; id=later")).unwrap();
        assert_eq!(find(&pairs, "id"), Some("abc123"));
        assert_eq!(find(&pairs, "theme"), Some("dark"));
        assert_eq!(find(&pairs, "missing"), None);
    }

    #[test]
    fn test_find_skips_valueless_pairs() {
        let pairs = parse(Some("id; id=real")).unwrap();
        assert_eq!(find(&pairs, "id"), Some("real"));
    }

    #[test]
    fn test_header_map_source() {
        let mut headers = HeaderMap::new();
        assert!(headers.cookie_header().is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("a=1"));
        assert_eq!(headers.cookie_header().as_deref(), Some("a=1"));

        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        headers.append(header::COOKIE, HeaderValue::from_static("c=3"));
        assert_eq!(headers.cookie_header().as_deref(), Some("a=1; b=2; c=3"));
    }

    #[test]
    fn test_request_source() {
        let request = Request::builder()
            .header(header::COOKIE, "id=abc")
            .body(())
            .unwrap();
        assert_eq!(request.cookie_header().as_deref(), Some("id=abc"));
    }
}
