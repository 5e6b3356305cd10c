//! Envelope serialization and error formatting.

use tracing::error;
use waypost_model::error::{ApiError, codes, messages};
use waypost_model::payload::PayloadEnvelope;

use crate::body::ResponseBody;

/// Content type of every envelope response.
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serialize an envelope into a body, falling back to a 500 encoding error
/// if it cannot be represented as JSON.
#[must_use]
pub fn encode_envelope(
    status: http::StatusCode,
    envelope: &PayloadEnvelope,
) -> (http::StatusCode, ResponseBody) {
    match ResponseBody::from_envelope(envelope) {
        Ok(body) => (status, body),
        Err(err) => {
            error!(error = %err, "failed to encode response envelope");
            let fallback = PayloadEnvelope::error(codes::PAYLOAD_ENCODING, messages::INTERNAL);
            (
                http::StatusCode::INTERNAL_SERVER_ERROR,
                ResponseBody::from_bytes(
                    serde_json::to_vec(&fallback).expect("JSON serialization of error cannot fail"),
                ),
            )
        }
    }
}

/// Build a complete response around an envelope.
#[must_use]
pub fn envelope_response(
    status: http::StatusCode,
    envelope: &PayloadEnvelope,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let (status, body) = encode_envelope(status, envelope);
    json_response(status, body, request_id)
}

/// Convert an `ApiError` into a complete HTTP error response.
///
/// ```json
/// {
///   "ErrorNumber": 4040000404,
///   "ErrorMessage": "404 Not Found"
/// }
/// ```
#[must_use]
pub fn error_to_response(error: &ApiError, request_id: &str) -> http::Response<ResponseBody> {
    envelope_response(
        error.status_code,
        &PayloadEnvelope::from_error(error),
        request_id,
    )
}

/// Build a response around a JSON body.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    body: ResponseBody,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let mut response = http::Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE)
        .body(body)
        .expect("valid JSON response");

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }

    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn json_of(body: ResponseBody) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_should_build_error_response_with_correct_status() {
        let resp = error_to_response(&ApiError::not_found(), "test-req-123");
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(resp.headers().get("content-type").unwrap(), CONTENT_TYPE);
        assert_eq!(
            resp.headers().get(REQUEST_ID_HEADER).unwrap(),
            "test-req-123"
        );
    }

    #[tokio::test]
    async fn test_should_hide_debug_detail_of_server_errors() {
        let err = ApiError::internal("connection pool exhausted");
        let (status, body) = encode_envelope(err.status_code, &PayloadEnvelope::from_error(&err));
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        let parsed = json_of(body).await;
        assert_eq!(parsed["ErrorNumber"], codes::INTERNAL);
        assert!(parsed.get("DebugMessage").is_none());
    }

    #[tokio::test]
    async fn test_should_encode_ok_envelope() {
        let (status, body) = encode_envelope(http::StatusCode::OK, &PayloadEnvelope::ok());
        assert_eq!(status, http::StatusCode::OK);
        let parsed = json_of(body).await;
        assert_eq!(parsed["ErrorNumber"], 0);
    }
}
