//! URL normalization for request identity and manifest resolution.

/// Error type for request-URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    /// A scheme the engine must not intercept (anything but http/https).
    #[error("non-interceptable scheme: {0}")]
    NonHttp(String),

    #[error("invalid URL: {0}")]
    Invalid(String),
}

/// Normalize a request URL for hashing and lookup.
///
/// Parsing already lowercases scheme and host; on top of that the fragment
/// is dropped and the query kept, so `/a?x=1` and `/a?x=1#top` share an
/// identity while `/a?x=2` does not. Non-http(s) schemes are refused so
/// the caller can let those requests through untouched.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::Invalid(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::NonHttp(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a same-origin manifest path against the configured origin.
pub fn resolve(origin: &str, path: &str) -> Result<url::Url, UrlError> {
    let base = url::Url::parse(origin).map_err(|e| UrlError::Invalid(e.to_string()))?;
    base.join(path).map_err(|e| UrlError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercases_host() {
        let url = canonicalize("https://EXAMPLE.COM/App.js").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/App.js");
    }

    #[test]
    fn test_canonicalize_removes_fragment() {
        let url = canonicalize("https://example.com/page#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/page");
    }

    #[test]
    fn test_canonicalize_preserves_query() {
        let url = canonicalize("https://example.com/search?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_trims_whitespace() {
        let url = canonicalize("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_refuses_non_http_scheme() {
        let result = canonicalize("chrome-extension://abcdef/page.html");
        assert!(matches!(result, Err(UrlError::NonHttp(_))));

        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::NonHttp(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_schemeless_is_invalid() {
        let result = canonicalize("example.com/page");
        assert!(matches!(result, Err(UrlError::Invalid(_))));
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve("http://localhost:8080", "/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_resolve_nested_path() {
        let url = resolve("http://localhost:8080", "/icons/icon-192x192.png").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/icons/icon-192x192.png");
    }

    #[test]
    fn test_resolve_bad_origin() {
        assert!(resolve("not a url", "/").is_err());
    }
}
