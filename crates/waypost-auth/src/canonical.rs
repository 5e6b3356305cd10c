//! Canonical string construction.
//!
//! ```text
//! HTTPMethod\n
//! NormalizedURI\n
//! Date\n
//! PublicKey\n
//! Scheme
//! ```
//!
//! No other part of the request participates. Signer and verifier must agree
//! on this byte for byte.

/// Normalize a request target for signing.
///
/// The query string and fragment are dropped, the path is lower-cased, and
/// trailing slashes are removed.
///
/// # Examples
///
/// ```
/// use waypost_auth::canonical::normalize_uri;
///
/// assert_eq!(normalize_uri("/API/v1/Book/"), "/api/v1/book");
/// assert_eq!(normalize_uri("/search?q=what&z=z"), "/search");
/// ```
#[must_use]
pub fn normalize_uri(request_target: &str) -> String {
    let path = request_target
        .split_once(['?', '#'])
        .map_or(request_target, |(path, _)| path);
    path.trim_end_matches('/').to_lowercase()
}

/// Build the canonical string from its already-normalized components.
///
/// # Examples
///
/// ```
/// use waypost_auth::canonical::build_canonical_string;
///
/// let canonical = build_canonical_string("GET", "/search", "abc", "abc", "S1-HMACSHA512");
/// assert_eq!(canonical, "GET\n/search\nabc\nabc\nS1-HMACSHA512");
/// ```
#[must_use]
pub fn build_canonical_string(
    method: &str,
    normalized_uri: &str,
    date: &str,
    public_key: &str,
    scheme: &str,
) -> String {
    format!("{method}\n{normalized_uri}\n{date}\n{public_key}\n{scheme}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_strip_query_and_fragment() {
        assert_eq!(normalize_uri("/a/b?x=1#frag"), "/a/b");
        assert_eq!(normalize_uri("/a/b#frag"), "/a/b");
    }

    #[test]
    fn test_should_strip_every_trailing_slash() {
        assert_eq!(normalize_uri("/api/v1/qa/all//"), "/api/v1/qa/all");
        assert_eq!(normalize_uri("/"), "");
    }

    #[test]
    fn test_should_lowercase_path_only() {
        assert_eq!(normalize_uri("/Api/V1/QA?Key=Value"), "/api/v1/qa");
    }

    #[test]
    fn test_should_join_components_in_fixed_order() {
        let canonical = build_canonical_string("POST", "/x", "d", "p", "s");
        assert_eq!(canonical.split('\n').collect::<Vec<_>>(), ["POST", "/x", "d", "p", "s"]);
    }
}
