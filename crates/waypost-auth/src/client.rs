//! Helpers for signing outgoing requests.

use chrono::{DateTime, Utc};
use http::HeaderValue;

use crate::error::AuthError;
use crate::signing::{
    DATE_FORMAT, DATE_HEADER, PUBLIC_KEY_HEADER, SCHEME, SCHEME_HEADER, SIGNATURE_HEADER,
    encode_signature, sign,
};

/// Format a timestamp the way the date header expects.
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Stamp the four auth headers onto `headers` for a request signed with `date`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidHeaderValue`] if the public key or date cannot
/// be carried in a header.
pub fn insert_auth_headers(
    headers: &mut http::HeaderMap,
    method: &http::Method,
    uri: &http::Uri,
    date: &str,
    public_key: &str,
    secret_key: &str,
) -> Result<(), AuthError> {
    let signature = encode_signature(&sign(
        secret_key,
        method.as_str(),
        uri.path(),
        date,
        public_key,
    ));

    headers.insert(
        DATE_HEADER,
        HeaderValue::from_str(date).map_err(|_| AuthError::InvalidHeaderValue(DATE_HEADER))?,
    );
    headers.insert(
        PUBLIC_KEY_HEADER,
        HeaderValue::from_str(public_key)
            .map_err(|_| AuthError::InvalidHeaderValue(PUBLIC_KEY_HEADER))?,
    );
    headers.insert(SCHEME_HEADER, HeaderValue::from_static(SCHEME));
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&signature)
            .map_err(|_| AuthError::InvalidHeaderValue(SIGNATURE_HEADER))?,
    );
    Ok(())
}

/// Sign a request in place using the current UTC time as the request date.
///
/// Any auth headers already present are replaced.
///
/// # Errors
///
/// Returns [`AuthError::InvalidHeaderValue`] if the public key cannot be
/// carried in a header.
pub fn sign_request<B>(
    request: &mut http::Request<B>,
    public_key: &str,
    secret_key: &str,
) -> Result<(), AuthError> {
    let date = format_date(Utc::now());
    let method = request.method().clone();
    let uri = request.uri().clone();
    insert_auth_headers(
        request.headers_mut(),
        &method,
        &uri,
        &date,
        public_key,
        secret_key,
    )
}
