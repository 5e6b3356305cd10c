//! `S1-HMACSHA512` signing and verification.
//!
//! Verification runs these checks in order, each with its own failure:
//!
//! 1. Exactly one value for each of the date, public key, scheme and
//!    signature headers.
//! 2. Optional: the date header parses and lies within the configured
//!    clock skew.
//! 3. The scheme header equals [`SCHEME`].
//! 4. The signature header decodes as URL-safe base64.
//! 5. The recomputed signature matches under constant-time comparison.
//!
//! The main entry point for servers is [`authenticate`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{build_canonical_string, normalize_uri};
use crate::credentials::SecretKeyProvider;
use crate::error::AuthError;

/// The only scheme supported by this implementation.
pub const SCHEME: &str = "S1-HMACSHA512";

/// Header carrying the request date.
pub const DATE_HEADER: &str = "x-auth-date";
/// Header carrying the caller's public key.
pub const PUBLIC_KEY_HEADER: &str = "x-auth-pub";
/// Header carrying the signing scheme.
pub const SCHEME_HEADER: &str = "x-auth-scheme";
/// Header carrying the base64 signature.
pub const SIGNATURE_HEADER: &str = "x-auth-sig";

/// `strftime` format of the date header, always UTC.
pub const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

type HmacSha512 = Hmac<Sha512>;

/// Verification knobs beyond the fixed protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Reject requests whose date header is further than this from now.
    ///
    /// `None` (the default) means the date is only an opaque signed string.
    pub max_clock_skew: Option<TimeDelta>,
}

impl AuthPolicy {
    /// A policy that enforces a freshness window of `secs` seconds.
    ///
    /// Windows too large for a [`TimeDelta`] saturate to [`TimeDelta::MAX`];
    /// the date header must still parse.
    #[must_use]
    pub fn with_max_clock_skew_secs(secs: u64) -> Self {
        let window = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            max_clock_skew: Some(window),
        }
    }
}

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The public key that signed the request.
    pub public_key: String,
    /// The date header the signature is bound to.
    pub date: String,
}

/// Derive the date-bound signing key.
///
/// ```text
/// SigningKey = HMAC-SHA512(secret_key, date)
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str) -> Vec<u8> {
    hmac_sha512(secret_key.as_bytes(), date.as_bytes())
}

/// Compute the raw signature of a canonical string.
#[must_use]
pub fn compute_signature(signing_key: &[u8], canonical: &str) -> Vec<u8> {
    hmac_sha512(signing_key, canonical.as_bytes())
}

/// Sign a request described by its components.
///
/// `uri` may still carry a query string or trailing slash; it is normalized
/// here.
///
/// # Examples
///
/// ```
/// use waypost_auth::signing::{encode_signature, sign};
///
/// let sig = sign("secretKey", "GET", "/search", "abc", "abc");
/// assert_eq!(sig.len(), 64);
/// assert!(encode_signature(&sig).ends_with("=="));
/// ```
#[must_use]
pub fn sign(secret_key: &str, method: &str, uri: &str, date: &str, public_key: &str) -> Vec<u8> {
    let canonical = build_canonical_string(method, &normalize_uri(uri), date, public_key, SCHEME);
    let signing_key = derive_signing_key(secret_key, date);
    compute_signature(&signing_key, &canonical)
}

/// Encode a raw signature for the signature header.
#[must_use]
pub fn encode_signature(signature: &[u8]) -> String {
    URL_SAFE.encode(signature)
}

/// Verify the auth headers of a request against a known secret key.
///
/// # Errors
///
/// Returns the [`AuthError`] of the first check that fails.
pub fn verify(
    secret_key: &str,
    method: &str,
    uri: &str,
    headers: &http::HeaderMap,
    policy: &AuthPolicy,
) -> Result<AuthResult, AuthError> {
    let date = single_header(headers, DATE_HEADER)?;
    let public_key = single_header(headers, PUBLIC_KEY_HEADER)?;
    let scheme = single_header(headers, SCHEME_HEADER)?;
    let encoded_signature = single_header(headers, SIGNATURE_HEADER)?;

    if let Some(max_skew) = policy.max_clock_skew {
        check_freshness(date, max_skew, Utc::now())?;
    }

    if scheme != SCHEME {
        return Err(AuthError::UnsupportedScheme(scheme.to_owned()));
    }

    let provided = URL_SAFE
        .decode(encoded_signature)
        .map_err(|_| AuthError::InvalidSignatureEncoding)?;

    let expected = sign(secret_key, method, uri, date, public_key);

    if provided.as_slice().ct_eq(expected.as_slice()).into() {
        debug!(public_key, "signature verification succeeded");
        Ok(AuthResult {
            public_key: public_key.to_owned(),
            date: date.to_owned(),
        })
    } else {
        debug!(public_key, "signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

/// Authenticate a request, resolving its secret key through `provider`.
///
/// This function:
/// 1. Extracts the public key header
/// 2. Resolves the secret key via the provider
/// 3. Runs [`verify`] with the request method and path
///
/// # Errors
///
/// Returns an [`AuthError`] if a header is missing or malformed, the public
/// key is unknown, or the signature does not match.
pub fn authenticate(
    parts: &http::request::Parts,
    provider: &dyn SecretKeyProvider,
    policy: &AuthPolicy,
) -> Result<AuthResult, AuthError> {
    let public_key = single_header(&parts.headers, PUBLIC_KEY_HEADER)?;
    let secret_key = provider.secret_key(public_key)?;

    verify(
        &secret_key,
        parts.method.as_str(),
        parts.uri.path(),
        &parts.headers,
        policy,
    )
}

/// Check that a date header lies within `max_skew` of `now`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidDate`] if the header does not follow
/// [`DATE_FORMAT`] and [`AuthError::StaleRequest`] if it is too far off.
pub fn check_freshness(
    date: &str,
    max_skew: TimeDelta,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let signed_at = NaiveDateTime::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| AuthError::InvalidDate(date.to_owned()))?
        .and_utc();

    if (now - signed_at).abs() > max_skew {
        return Err(AuthError::StaleRequest {
            date: date.to_owned(),
        });
    }
    Ok(())
}

/// Extract the single value of an auth header.
fn single_header<'a>(
    headers: &'a http::HeaderMap,
    name: &'static str,
) -> Result<&'a str, AuthError> {
    let mut values = headers.get_all(name).iter();
    let (Some(value), None) = (values.next(), values.next()) else {
        return Err(AuthError::HeaderArity {
            header: name,
            count: headers.get_all(name).iter().count(),
        });
    };
    value
        .to_str()
        .map_err(|_| AuthError::InvalidHeaderValue(name))
}

/// Compute HMAC-SHA512 and return the raw bytes.
fn hmac_sha512(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
