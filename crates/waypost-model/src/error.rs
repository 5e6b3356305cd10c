//! API error types and the stable error numbers clients program against.
//!
//! Every error that reaches a client carries an HTTP status and a numeric
//! error number. The numbers are part of the wire contract: clients switch on
//! them, so they never change once published.

use std::fmt;

/// Stable error numbers emitted by the dispatcher and the standard handlers.
pub mod codes {
    /// No route matches the request.
    pub const NOT_FOUND: i64 = 4_040_000_404;
    /// Generic bad request.
    pub const BAD_REQUEST: i64 = 4_000_000_000;
    /// The request could not be understood.
    pub const BAD_REQUEST_SYNTAX: i64 = 4_000_000_001;
    /// A read or update request carried no primary key.
    pub const MISSING_PRIMARY_KEY: i64 = 4_000_000_002;
    /// A create request carried a primary key.
    pub const EXTRANEOUS_PRIMARY_KEY: i64 = 4_000_000_003;
    /// Authentication failed. Deliberately the same for every failed sub-check.
    pub const FORBIDDEN: i64 = 4_030_000_403;
    /// Unclassified internal failure.
    pub const INTERNAL: i64 = 5_000_000_000;
    /// A handler completed without producing a response.
    pub const EMPTY_RESPONSE: i64 = 5_000_000_001;
    /// The response envelope could not be serialized.
    pub const PAYLOAD_ENCODING: i64 = 1_589_720_731;
    /// The request path does not start with the API base prefix.
    pub const INVALID_PREFIX: i64 = 3_475_081_071;
    /// The request path is missing the version or entity segment.
    pub const TOO_FEW_SEGMENTS: i64 = 3_475_081_072;
    /// The parsed endpoint broke its own construction invariant.
    pub const ENDPOINT_INVARIANT: i64 = 3_475_081_079;
    /// A create or update request arrived without a body.
    pub const CREATE_EMPTY_BODY: i64 = 3_370_318_075;
    /// A create request body was not valid JSON for the payload.
    pub const CREATE_UNPARSEABLE_BODY: i64 = 3_540_227_685;
    /// An update request arrived without a body.
    pub const UPDATE_EMPTY_BODY: i64 = 3_851_489_100;
    /// An update request body was not valid JSON for the payload.
    pub const UPDATE_UNPARSEABLE_BODY: i64 = 1_858_602_328;
    /// A handler asked for a JSON body that was empty.
    pub const DECODE_EMPTY_BODY: i64 = 3_003_399_819;
    /// A handler asked for a JSON body that did not parse.
    pub const DECODE_UNPARSEABLE_BODY: i64 = 3_005_488_054;
}

/// End-user message prefixes.
pub mod messages {
    /// 404 prefix.
    pub const NOT_FOUND: &str = "404 Not Found";
    /// 400 prefix.
    pub const BAD_REQUEST: &str = "400 Bad Request";
    /// 400 syntax prefix.
    pub const BAD_REQUEST_SYNTAX: &str = "400 Bad Request: Syntax Error";
    /// 403 prefix.
    pub const FORBIDDEN: &str = "403 Forbidden";
    /// 500 prefix.
    pub const INTERNAL: &str = "500 Internal Server Error";
}

/// Taxonomy of failures, used for logging and for picking a response path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller sent something malformed.
    Client,
    /// The caller could not be authenticated.
    Auth,
    /// Something is wrong on our side.
    Server,
}

/// Well-known API errors produced by the routing layer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ApiErrorKind {
    /// No matching route.
    NotFound,
    /// Generic bad request.
    BadRequest,
    /// Unparseable request.
    SyntaxError,
    /// Missing primary key.
    MissingPrimaryKey,
    /// Extraneous primary key.
    ExtraneousPrimaryKey,
    /// Authentication failure.
    Forbidden,
    /// Internal failure.
    Internal,
    /// Handler produced nothing.
    EmptyResponse,
}

impl ApiErrorKind {
    /// Returns the stable error number.
    #[must_use]
    pub fn err_no(self) -> i64 {
        match self {
            Self::NotFound => codes::NOT_FOUND,
            Self::BadRequest => codes::BAD_REQUEST,
            Self::SyntaxError => codes::BAD_REQUEST_SYNTAX,
            Self::MissingPrimaryKey => codes::MISSING_PRIMARY_KEY,
            Self::ExtraneousPrimaryKey => codes::EXTRANEOUS_PRIMARY_KEY,
            Self::Forbidden => codes::FORBIDDEN,
            Self::Internal => codes::INTERNAL,
            Self::EmptyResponse => codes::EMPTY_RESPONSE,
        }
    }

    /// Returns the default end-user message for this kind.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => messages::NOT_FOUND,
            Self::BadRequest | Self::MissingPrimaryKey | Self::ExtraneousPrimaryKey => {
                messages::BAD_REQUEST
            }
            Self::SyntaxError => messages::BAD_REQUEST_SYNTAX,
            Self::Forbidden => messages::FORBIDDEN,
            Self::Internal | Self::EmptyResponse => messages::INTERNAL,
        }
    }

    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub fn default_status_code(self) -> http::StatusCode {
        match self {
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::BadRequest
            | Self::SyntaxError
            | Self::MissingPrimaryKey
            | Self::ExtraneousPrimaryKey => http::StatusCode::BAD_REQUEST,
            Self::Forbidden => http::StatusCode::FORBIDDEN,
            Self::Internal | Self::EmptyResponse => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error destined for the client, carried in the response envelope.
#[derive(Debug)]
pub struct ApiError {
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The stable error number.
    pub err_no: i64,
    /// End-user appropriate message.
    pub message: String,
    /// Optional secondary number, meant for developers rather than end users.
    pub debug_number: Option<i64>,
    /// Optional developer-facing detail.
    pub debug_message: Option<String>,
    /// The underlying source error, if any. Never sent to the client.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiError({} {}): {}",
            self.status_code.as_u16(),
            self.err_no,
            self.message
        )
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ApiError {
    /// Create an error from a well-known kind.
    #[must_use]
    pub fn new(kind: ApiErrorKind) -> Self {
        Self::custom(kind.default_status_code(), kind.err_no(), kind.message())
    }

    /// Create an error from a well-known kind with a custom message.
    #[must_use]
    pub fn with_message(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self::custom(kind.default_status_code(), kind.err_no(), message)
    }

    /// Create an error with an arbitrary status and error number.
    ///
    /// An empty message is replaced by the status code's canonical reason.
    #[must_use]
    pub fn custom(status_code: http::StatusCode, err_no: i64, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = status_code.canonical_reason().unwrap_or_default().to_owned();
        }
        Self {
            status_code,
            err_no,
            message,
            debug_number: None,
            debug_message: None,
            source: None,
        }
    }

    /// Attach developer-facing debug detail.
    #[must_use]
    pub fn with_debug(mut self, debug_number: i64, debug_message: impl Into<String>) -> Self {
        self.debug_number = Some(debug_number);
        self.debug_message = Some(debug_message.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Classify the error by its status code.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.status_code == http::StatusCode::FORBIDDEN
            || self.status_code == http::StatusCode::UNAUTHORIZED
        {
            ErrorClass::Auth
        } else if self.status_code.is_server_error() {
            ErrorClass::Server
        } else {
            ErrorClass::Client
        }
    }

    // -- Convenience constructors --

    /// No matching route.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ApiErrorKind::NotFound)
    }

    /// Generic bad request with a message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorKind::BadRequest, message)
    }

    /// The request carried no primary key where one is required.
    #[must_use]
    pub fn missing_primary_key() -> Self {
        Self::new(ApiErrorKind::MissingPrimaryKey)
    }

    /// The request carried a primary key where none is allowed.
    #[must_use]
    pub fn extraneous_primary_key() -> Self {
        Self::new(ApiErrorKind::ExtraneousPrimaryKey)
    }

    /// Authentication failure.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(ApiErrorKind::Forbidden)
    }

    /// Internal failure. The detail is kept as debug information for logs.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let mut err = Self::new(ApiErrorKind::Internal);
        err.debug_message = Some(detail);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_not_found_with_stable_number() {
        let err = ApiError::not_found();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(err.err_no, 4_040_000_404);
        assert_eq!(err.message, "404 Not Found");
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[test]
    fn test_should_fill_empty_message_from_status() {
        let err = ApiError::custom(http::StatusCode::CONFLICT, 42, "");
        assert_eq!(err.message, "Conflict");
    }

    #[test]
    fn test_should_classify_forbidden_as_auth() {
        assert_eq!(ApiError::forbidden().class(), ErrorClass::Auth);
        assert_eq!(ApiError::internal("boom").class(), ErrorClass::Server);
    }

    #[test]
    fn test_should_keep_internal_detail_out_of_message() {
        let err = ApiError::internal("table lock poisoned");
        assert_eq!(err.message, "500 Internal Server Error");
        assert_eq!(err.debug_message.as_deref(), Some("table lock poisoned"));
    }

    #[test]
    fn test_should_distinguish_primary_key_errors() {
        assert_ne!(
            ApiError::missing_primary_key().err_no,
            ApiError::extraneous_primary_key().err_no
        );
        assert_ne!(ApiError::extraneous_primary_key().err_no, codes::BAD_REQUEST);
    }
}
