//! Endpoint path parsing.
//!
//! Every API path follows one convention:
//!
//! ```text
//! /{base}/v{N}/{entity}[/{primary_key}][/{action}][/{extra}...]
//! ```
//!
//! [`parse_endpoint`] turns such a path into an [`Endpoint`]. It is a pure
//! function: the same path and prefix always yield the same descriptor.

use std::sync::OnceLock;

use waypost_model::error::{ApiError, ErrorClass, codes, messages};

/// Parsed representation of a request path.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    version_token: String,
    version: OnceLock<Option<u16>>,
    entity: String,
    primary_key: i64,
    action: String,
    extras: Vec<String>,
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.version_token == other.version_token
            && self.entity == other.entity
            && self.primary_key == other.primary_key
            && self.action == other.action
            && self.extras == other.extras
    }
}

impl Eq for Endpoint {}

impl Endpoint {
    /// The version token with any `v` prefix and leading zeros removed.
    #[must_use]
    pub fn version_token(&self) -> &str {
        &self.version_token
    }

    /// The numeric version, parsed on first use.
    ///
    /// `None` when the token is not a valid 16-bit unsigned integer.
    #[must_use]
    pub fn version(&self) -> Option<u16> {
        *self
            .version
            .get_or_init(|| self.version_token.parse::<u16>().ok())
    }

    /// The entity segment exactly as it appeared in the path.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The primary key, or zero when absent.
    #[must_use]
    pub fn primary_key(&self) -> i64 {
        self.primary_key
    }

    /// Whether a non-zero primary key was present.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        self.primary_key != 0
    }

    /// The action segment, or empty for the default operation.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// All segments after the entity, primary key included.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Render the descriptor back into a path under `base_prefix`.
    ///
    /// Parsing the result with the same prefix yields an equal descriptor.
    #[must_use]
    pub fn to_path(&self, base_prefix: &str) -> String {
        let mut path = String::from("/");
        let prefix = base_prefix.trim_matches('/');
        if !prefix.is_empty() {
            path.push_str(prefix);
            path.push('/');
        }
        path.push('v');
        path.push_str(&self.version_token);
        path.push('/');
        path.push_str(&self.entity);
        for extra in &self.extras {
            path.push('/');
            path.push_str(extra);
        }
        path
    }

    fn check_invariants(&self) -> Result<(), ParseError> {
        if self.has_primary_key() {
            let first = self.extras.first().map(|s| s.parse::<i64>());
            if first != Some(Ok(self.primary_key)) {
                return Err(ParseError::Invariant(format!(
                    "primary key {} is not the first extra segment",
                    self.primary_key
                )));
            }
        }
        if !self.action.is_empty() && !self.extras.iter().any(|e| *e == self.action) {
            return Err(ParseError::Invariant(format!(
                "action {} is missing from the extra segments",
                self.action
            )));
        }
        Ok(())
    }
}

/// Reasons a path cannot be turned into an [`Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The path lives outside the API base prefix.
    #[error("path {path} is outside the API prefix /{prefix}")]
    InvalidPrefix {
        /// The offending path.
        path: String,
        /// The expected prefix, without slashes.
        prefix: String,
    },

    /// The path lacks a version or entity segment.
    #[error("path {0} is missing the version or entity segment")]
    TooFewSegments(String),

    /// The descriptor built from the path broke its own invariant.
    #[error("endpoint invariant violated: {0}")]
    Invariant(String),
}

impl ParseError {
    /// Client-class errors are the caller's fault; server-class ones are ours.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidPrefix { .. } | Self::TooFewSegments(_) => ErrorClass::Client,
            Self::Invariant(_) => ErrorClass::Server,
        }
    }

    /// The stable error number.
    #[must_use]
    pub fn err_no(&self) -> i64 {
        match self {
            Self::InvalidPrefix { .. } => codes::INVALID_PREFIX,
            Self::TooFewSegments(_) => codes::TOO_FEW_SEGMENTS,
            Self::Invariant(_) => codes::ENDPOINT_INVARIANT,
        }
    }

    /// The error as it is presented to the client.
    ///
    /// A path the API cannot address is indistinguishable from a missing
    /// route, so client-class failures are reported as not found.
    #[must_use]
    pub fn to_api_error(&self) -> ApiError {
        match self.class() {
            ErrorClass::Server => ApiError::custom(
                http::StatusCode::INTERNAL_SERVER_ERROR,
                self.err_no(),
                messages::INTERNAL,
            )
            .with_debug(self.err_no(), self.to_string()),
            ErrorClass::Client | ErrorClass::Auth => ApiError::custom(
                http::StatusCode::NOT_FOUND,
                self.err_no(),
                messages::NOT_FOUND,
            ),
        }
    }
}

/// Parse a request path under `base_prefix` into an [`Endpoint`].
///
/// The path must not carry a query string or fragment.
///
/// # Examples
///
/// ```
/// use waypost_http::endpoint::parse_endpoint;
///
/// let endpoint = parse_endpoint("/api/v01/entity/007/action", "/api/").unwrap();
/// assert_eq!(endpoint.version_token(), "1");
/// assert_eq!(endpoint.primary_key(), 7);
/// assert_eq!(endpoint.action(), "action");
/// assert_eq!(endpoint.extras(), ["007", "action"]);
/// ```
pub fn parse_endpoint(path: &str, base_prefix: &str) -> Result<Endpoint, ParseError> {
    let trimmed_path = path.trim_matches('/');
    let prefix = base_prefix.trim_matches('/');

    let remainder = strip_prefix_segment(trimmed_path, prefix).ok_or_else(|| {
        ParseError::InvalidPrefix {
            path: path.to_owned(),
            prefix: prefix.to_owned(),
        }
    })?;

    let segments: Vec<&str> = remainder.trim_matches('/').split('/').collect();
    if segments.len() < 2 {
        return Err(ParseError::TooFewSegments(path.to_owned()));
    }

    let version_token = segments[0]
        .trim_start_matches(['v', 'V'])
        .trim_start_matches('0')
        .to_owned();
    let entity = segments[1].to_owned();

    let mut primary_key = 0;
    let mut action = String::new();
    if let Some(third) = segments.get(2) {
        if let Ok(pk) = third.parse::<i64>() {
            primary_key = pk;
            if let Some(fourth) = segments.get(3) {
                (*fourth).clone_into(&mut action);
            }
        } else {
            (*third).clone_into(&mut action);
        }
    }

    let extras = segments
        .get(2..)
        .unwrap_or_default()
        .iter()
        .map(|s| (*s).to_owned())
        .collect();

    let endpoint = Endpoint {
        version_token,
        version: OnceLock::new(),
        entity,
        primary_key,
        action,
        extras,
    };
    endpoint.check_invariants()?;
    Ok(endpoint)
}

/// Remove `prefix` from `path` if it covers whole leading segments.
fn strip_prefix_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/api/";

    #[test]
    fn test_should_parse_full_endpoint() {
        let endpoint = parse_endpoint("/api/v01/entity/007/action", PREFIX).unwrap();
        assert_eq!(endpoint.version_token(), "1");
        assert_eq!(endpoint.version(), Some(1));
        assert_eq!(endpoint.entity(), "entity");
        assert_eq!(endpoint.primary_key(), 7);
        assert_eq!(endpoint.action(), "action");
        assert_eq!(endpoint.extras(), ["007", "action"]);
    }

    #[test]
    fn test_should_treat_non_numeric_third_segment_as_action() {
        let endpoint = parse_endpoint("/api/v1/book/Popular/extra", PREFIX).unwrap();
        assert_eq!(endpoint.primary_key(), 0);
        assert_eq!(endpoint.action(), "Popular");
        assert_eq!(endpoint.extras(), ["Popular", "extra"]);
    }

    #[test]
    fn test_should_parse_entity_only() {
        let endpoint = parse_endpoint("/api/V2/Book/", PREFIX).unwrap();
        assert_eq!(endpoint.version_token(), "2");
        assert_eq!(endpoint.entity(), "Book");
        assert!(!endpoint.has_primary_key());
        assert!(endpoint.action().is_empty());
        assert!(endpoint.extras().is_empty());
    }

    #[test]
    fn test_should_parse_primary_key_without_action() {
        let endpoint = parse_endpoint("api/v1/book/-12", "api").unwrap();
        assert_eq!(endpoint.primary_key(), -12);
        assert!(endpoint.action().is_empty());
        assert_eq!(endpoint.extras(), ["-12"]);
    }

    #[test]
    fn test_should_reject_path_outside_prefix_as_client_error() {
        let err = parse_endpoint("/other/v1/book", PREFIX).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPrefix { .. }));
        assert_eq!(err.class(), ErrorClass::Client);
        assert_eq!(err.to_api_error().status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(err.to_api_error().err_no, codes::INVALID_PREFIX);
    }

    #[test]
    fn test_should_not_match_prefix_inside_a_segment() {
        let err = parse_endpoint("/apiary/v1/book", PREFIX).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPrefix { .. }));
    }

    #[test]
    fn test_should_reject_too_few_segments() {
        for path in ["/api", "/api/", "/api/v1", "/api/v1/"] {
            let err = parse_endpoint(path, PREFIX).unwrap_err();
            assert!(matches!(err, ParseError::TooFewSegments(_)), "{path}");
            assert_eq!(err.class(), ErrorClass::Client);
        }
    }

    #[test]
    fn test_should_accept_empty_prefix() {
        let endpoint = parse_endpoint("/v3/author/9", "/").unwrap();
        assert_eq!(endpoint.version_token(), "3");
        assert_eq!(endpoint.primary_key(), 9);
    }

    #[test]
    fn test_should_report_no_version_for_oversized_token() {
        let endpoint = parse_endpoint("/api/v70000/book", PREFIX).unwrap();
        assert_eq!(endpoint.version_token(), "70000");
        assert_eq!(endpoint.version(), None);

        let endpoint = parse_endpoint("/api/vbeta/book", PREFIX).unwrap();
        assert_eq!(endpoint.version_token(), "beta");
        assert_eq!(endpoint.version(), None);
    }

    #[test]
    fn test_should_reparse_rendered_path_to_same_endpoint() {
        let paths = [
            "/api/v1/book",
            "/api/v01/entity/007/action",
            "/api/V018/book/popular",
            "/api/v2/book/5/cover/large",
            "/api/v0/book/0/x",
            "/api/v1/book//gap",
            "/api/v9/Author/-3",
        ];
        for path in paths {
            let first = parse_endpoint(path, PREFIX).unwrap();
            let second = parse_endpoint(&first.to_path(PREFIX), PREFIX).unwrap();
            assert_eq!(first, second, "{path}");
        }
    }

    #[test]
    fn test_should_parse_independently_of_call_order() {
        let a = parse_endpoint("/api/v1/book/1", PREFIX).unwrap();
        let _ = parse_endpoint("/api/v2/author/x", PREFIX).unwrap();
        let b = parse_endpoint("/api/v1/book/1", PREFIX).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_should_classify_invariant_violation_as_server_error() {
        let err = ParseError::Invariant("broken".to_owned());
        assert_eq!(err.class(), ErrorClass::Server);
        assert!(err.to_api_error().status_code.is_server_error());
    }
}
