//! Route naming convention and route records.
//!
//! A controller operation becomes a route when its name follows
//!
//! ```text
//! [Auth]{Verb}Handler{V|v}{digits}{ActionSuffix}
//! ```
//!
//! for example `GetHandlerV1`, `AuthPutHandlerV2Archive` or
//! `GetHandlerV018Popular`. Names that do not match are ignored.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use waypost_auth::SecretKeyProvider;
use waypost_model::HttpVerb;

use crate::handler::Handler;

/// Marker separating the verb from the version in an operation name.
pub const HANDLER_MARKER: &str = "Handler";

/// Prefix marking an operation as requiring authentication.
pub const AUTH_PREFIX: &str = "Auth";

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Vv]([0-9]+)(.*)$").expect("valid version pattern"));

/// What an operation name says about the route it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// The verb the route binds to.
    pub verb: HttpVerb,
    /// Whether requests must pass signature verification.
    pub requires_auth: bool,
    /// Version digits without leading zeros.
    pub version_token: String,
    /// The numeric version.
    pub version: u16,
    /// Lower-cased action suffix, empty for the default operation.
    pub action: String,
}

/// Classify an operation name.
///
/// Returns `None` when the name is not a handler name: no `Handler` marker,
/// an unknown verb, or a version that is missing or does not fit in 16 bits.
///
/// # Examples
///
/// ```
/// use waypost_http::route::classify_operation;
/// use waypost_model::HttpVerb;
///
/// let spec = classify_operation("AuthGetHandlerV018Popular").unwrap();
/// assert_eq!(spec.verb, HttpVerb::Get);
/// assert!(spec.requires_auth);
/// assert_eq!(spec.version, 18);
/// assert_eq!(spec.action, "popular");
///
/// assert!(classify_operation("Validate").is_none());
/// ```
#[must_use]
pub fn classify_operation(name: &str) -> Option<RouteSpec> {
    if !name.contains(HANDLER_MARKER) {
        return None;
    }

    let (requires_auth, rest) = match name.strip_prefix(AUTH_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let (verb, versioned) = split_verb(rest)?;

    let captures = VERSION_PATTERN.captures(versioned)?;
    let digits = captures.get(1)?.as_str();
    let version_token = digits.trim_start_matches('0');
    let version = version_token.parse::<u16>().ok()?;
    let action = captures
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    Some(RouteSpec {
        verb,
        requires_auth,
        version_token: version_token.to_owned(),
        version,
        action,
    })
}

/// Strip the `{Verb}Handler` prefix, returning the verb and the version tail.
fn split_verb(name: &str) -> Option<(HttpVerb, &str)> {
    HttpVerb::ALL
        .into_iter()
        .find_map(|verb| name.strip_prefix(verb.handler_prefix()).map(|tail| (verb, tail)))
}

/// Identity of a route in the table.
///
/// Entity and action compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    entity: String,
    verb: HttpVerb,
    version_token: String,
    action: String,
}

impl RouteKey {
    /// Build a key, folding entity and action to lower case.
    #[must_use]
    pub fn new(entity: &str, verb: HttpVerb, version_token: &str, action: &str) -> Self {
        Self {
            entity: entity.to_lowercase(),
            verb,
            version_token: version_token.to_owned(),
            action: action.to_lowercase(),
        }
    }

    /// The lower-cased entity.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The verb.
    #[must_use]
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}/{}", self.verb, self.version_token, self.entity)?;
        if !self.action.is_empty() {
            write!(f, "/{}", self.action)?;
        }
        Ok(())
    }
}

/// Everything the dispatcher needs to serve one route.
#[derive(Clone)]
pub struct RouteRecord {
    /// The verb.
    pub verb: HttpVerb,
    /// Path suffix under the version, `{entity}` or `{entity}/{action}`.
    pub path: String,
    /// The numeric version.
    pub version: u16,
    /// The version token used for lookups.
    pub version_token: String,
    /// Lower-cased entity name.
    pub entity: String,
    /// Lower-cased action, empty for the default operation.
    pub action: String,
    /// Whether requests must authenticate.
    pub requires_auth: bool,
    /// Resolves secret keys for authenticated routes.
    pub authenticator: Option<Arc<dyn SecretKeyProvider>>,
    /// The handler.
    pub handler: Handler,
    /// Operation name, for diagnostics.
    pub handler_name: String,
    /// Controller name, for diagnostics.
    pub controller_name: String,
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("requires_auth", &self.requires_auth)
            .field("authenticator", &self.authenticator.as_ref().map(|_| "..."))
            .field("handler", &self.handler)
            .field("handler_name", &self.handler_name)
            .field("controller_name", &self.controller_name)
            .finish_non_exhaustive()
    }
}

impl RouteRecord {
    /// The table key of this record.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.entity, self.verb, &self.version_token, &self.action)
    }

    /// One summary line, e.g. `GET /api/v1/book/popular (BookController.AuthGetHandlerV1Popular, Read, auth)`.
    #[must_use]
    pub fn summary_line(&self, base_path: &str) -> String {
        let prefix = base_path.trim_matches('/');
        let mut line = format!("{} /", self.verb);
        if !prefix.is_empty() {
            line.push_str(prefix);
            line.push('/');
        }
        line.push_str(&format!(
            "v{}/{} ({}.{}, {:?}",
            self.version_token,
            self.path,
            self.controller_name,
            self.handler_name,
            self.handler.shape(),
        ));
        if self.requires_auth {
            line.push_str(", auth");
        }
        line.push(')');
        line
    }
}
