//! Error types for request authentication.
//!
//! Each failed sub-check has its own variant and a numeric code for server-side
//! logs. Callers facing the network must collapse all of them into a single
//! forbidden response.

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required auth header was absent or repeated.
    #[error("expected exactly one {header} header, found {count}")]
    HeaderArity {
        /// The header name.
        header: &'static str,
        /// How many values were present.
        count: usize,
    },

    /// An auth header value was not visible ASCII.
    #[error("invalid value in {0} header")]
    InvalidHeaderValue(&'static str),

    /// The scheme header named an algorithm other than the supported one.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The signature header was not URL-safe base64.
    #[error("signature is not valid URL-safe base64")]
    InvalidSignatureEncoding,

    /// The computed signature does not match the provided signature.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// The public key is not known to the secret key provider.
    #[error("unknown public key: {0}")]
    UnknownPublicKey(String),

    /// The secret key provider failed for a reason of its own.
    #[error("secret key lookup failed ({code}): {message}")]
    KeyLookup {
        /// Provider-specific failure code.
        code: i64,
        /// Provider-specific detail.
        message: String,
    },

    /// The date header does not follow the fixed date format.
    #[error("unparseable request date: {0}")]
    InvalidDate(String),

    /// The date header is further from the server clock than allowed.
    #[error("request date {date} is outside the allowed clock skew")]
    StaleRequest {
        /// The offending date header.
        date: String,
    },
}

impl AuthError {
    /// Numeric code identifying the failed sub-check in logs.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::HeaderArity { header, .. } => match *header {
                crate::signing::DATE_HEADER => 3_756_220_698,
                crate::signing::PUBLIC_KEY_HEADER => 3_444_855_534,
                _ => 32_601_110,
            },
            Self::InvalidHeaderValue(_) => 32_601_110,
            Self::InvalidDate(_) => 32_601_111,
            Self::StaleRequest { .. } => 32_601_112,
            Self::UnsupportedScheme(_) => 32_601_113,
            Self::InvalidSignatureEncoding => 32_601_114,
            Self::SignatureDoesNotMatch => 32_601_119,
            Self::UnknownPublicKey(_) => 32_601_120,
            Self::KeyLookup { code, .. } => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{DATE_HEADER, SIGNATURE_HEADER};

    #[test]
    fn test_should_give_each_sub_check_its_own_code() {
        let codes = [
            AuthError::HeaderArity {
                header: DATE_HEADER,
                count: 0,
            }
            .code(),
            AuthError::HeaderArity {
                header: SIGNATURE_HEADER,
                count: 2,
            }
            .code(),
            AuthError::UnsupportedScheme("HMAC-MD5".to_owned()).code(),
            AuthError::InvalidSignatureEncoding.code(),
            AuthError::SignatureDoesNotMatch.code(),
        ];
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn test_should_pass_through_provider_code() {
        let err = AuthError::KeyLookup {
            code: 77,
            message: "store offline".to_owned(),
        };
        assert_eq!(err.code(), 77);
    }
}
