//! Per-request state and the write-once response writer.

use std::net::SocketAddr;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::error;
use waypost_model::error::{ApiError, codes, messages};
use waypost_model::payload::{PayloadEnvelope, PayloadMap};

use crate::body::ResponseBody;
use crate::endpoint::Endpoint;
use crate::response::{envelope_response, error_to_response, json_response};

/// State of one request as it moves through the dispatcher.
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    parts: http::request::Parts,
    body: Bytes,
    endpoint: Endpoint,
    public_key: Option<String>,
    remote_addr: Option<SocketAddr>,
    extensions: http::Extensions,
    status: Option<http::StatusCode>,
    content_length: usize,
}

impl RequestContext {
    /// Create a context for a request whose endpoint is not yet parsed.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            parts,
            body,
            endpoint: Endpoint::default(),
            public_key: None,
            remote_addr,
            extensions: http::Extensions::new(),
            status: None,
            content_length: 0,
        }
    }

    /// The id echoed in the `x-request-id` header.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Method, URI, version and headers of the request.
    #[must_use]
    pub fn parts(&self) -> &http::request::Parts {
        &self.parts
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }

    /// The value of a header if present exactly once and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let mut values = self.parts.headers.get_all(name).iter();
        match (values.next(), values.next()) {
            (Some(value), None) => value.to_str().ok(),
            _ => None,
        }
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The parsed endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    /// The authenticated public key, set only after signature verification.
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub(crate) fn set_public_key(&mut self, public_key: Option<String>) {
        self.public_key = public_key;
    }

    /// The peer address, when the transport knows it.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Scratch space middleware can use to hand values to handlers.
    #[must_use]
    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    /// Mutable access to the scratch space.
    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }

    /// The status the response was written with.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.status
    }

    /// Number of body bytes in the response.
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub(crate) fn record_response(&mut self, status: http::StatusCode, content_length: usize) {
        self.status = Some(status);
        self.content_length = content_length;
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`ApiError`] if the body is empty or does not parse.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        decode_body(
            &self.body,
            codes::DECODE_EMPTY_BODY,
            codes::DECODE_UNPARSEABLE_BODY,
        )
    }
}

/// The 400 error for a request that needed a body and had none.
pub(crate) fn empty_body(err_no: i64) -> ApiError {
    ApiError::custom(
        http::StatusCode::BAD_REQUEST,
        err_no,
        format!("{}: Expected non-empty body", messages::BAD_REQUEST),
    )
}

/// Decode `body` into `T`, reporting failures with the given error numbers.
pub(crate) fn decode_body<T: DeserializeOwned>(
    body: &[u8],
    empty_err_no: i64,
    unparseable_err_no: i64,
) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(empty_body(empty_err_no));
    }
    serde_json::from_slice(body).map_err(|err| {
        ApiError::custom(
            http::StatusCode::BAD_REQUEST,
            unparseable_err_no,
            format!("{}: Cannot parse body", messages::BAD_REQUEST),
        )
        .with_debug(unparseable_err_no, err.to_string())
        .with_source(err)
    })
}

/// A second write to a [`ResponseWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("response already written")]
pub struct DoubleWrite;

/// Collects exactly one response.
///
/// Headers may be staged before the write; every write after the first is
/// logged and dropped.
#[derive(Debug)]
pub struct ResponseWriter {
    request_id: String,
    headers: http::HeaderMap,
    response: Option<http::Response<ResponseBody>>,
    content_length: usize,
}

impl ResponseWriter {
    /// Create a writer for the request with `request_id`.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            headers: http::HeaderMap::new(),
            response: None,
            content_length: 0,
        }
    }

    /// Headers merged into the response when it is written.
    pub fn headers_mut(&mut self) -> &mut http::HeaderMap {
        &mut self.headers
    }

    /// Whether a response has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.response.is_some()
    }

    /// The status of the written response.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response.as_ref().map(http::Response::status)
    }

    /// Body bytes of the written response.
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Write a raw response.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] if a response was already written.
    pub fn write(
        &mut self,
        status: http::StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), DoubleWrite> {
        self.ensure_unwritten()?;
        let mut response =
            json_response(status, ResponseBody::from_bytes(body.into()), &self.request_id);
        if let Ok(hv) = http::HeaderValue::from_str(content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, hv);
        }
        self.commit(response);
        Ok(())
    }

    /// Write an envelope with the given status.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] if a response was already written.
    pub fn send_envelope(
        &mut self,
        status: http::StatusCode,
        envelope: &PayloadEnvelope,
    ) -> Result<(), DoubleWrite> {
        self.ensure_unwritten()?;
        let response = envelope_response(status, envelope, &self.request_id);
        self.commit(response);
        Ok(())
    }

    /// Write a 200 envelope carrying `payloads`.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] if a response was already written.
    pub fn send_payloads(&mut self, payloads: PayloadMap) -> Result<(), DoubleWrite> {
        self.send_envelope(
            http::StatusCode::OK,
            &PayloadEnvelope::with_payloads(payloads),
        )
    }

    /// Write a bare 200 "ok" envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] if a response was already written.
    pub fn send_ok(&mut self) -> Result<(), DoubleWrite> {
        self.send_envelope(http::StatusCode::OK, &PayloadEnvelope::ok())
    }

    /// Write an error envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleWrite`] if a response was already written.
    pub fn send_error(&mut self, error: &ApiError) -> Result<(), DoubleWrite> {
        self.ensure_unwritten()?;
        let response = error_to_response(error, &self.request_id);
        self.commit(response);
        Ok(())
    }

    /// Take the written response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<http::Response<ResponseBody>> {
        self.response
    }

    fn ensure_unwritten(&self) -> Result<(), DoubleWrite> {
        if self.response.is_some() {
            error!(
                request_id = %self.request_id,
                "response already written, dropping second write"
            );
            return Err(DoubleWrite);
        }
        Ok(())
    }

    fn commit(&mut self, mut response: http::Response<ResponseBody>) {
        self.content_length = body_len(&response);
        let staged = std::mem::take(&mut self.headers);
        let headers = response.headers_mut();
        let mut last = None;
        for (name, value) in staged {
            if let Some(name) = name {
                headers.remove(&name);
                last = Some(name);
            }
            if let Some(name) = &last {
                headers.append(name.clone(), value);
            }
        }
        self.response = Some(response);
    }
}

fn body_len(response: &http::Response<ResponseBody>) -> usize {
    use http_body::Body as _;

    response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(method: http::Method, uri: &str, body: &'static str) -> RequestContext {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("x-trace", "one")
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::new("req-1", parts, Bytes::from_static(body.as_bytes()), None)
    }

    #[test]
    fn test_should_keep_first_write_and_drop_second() {
        let mut writer = ResponseWriter::new("req-1");
        writer.send_ok().unwrap();
        let second = writer.send_error(&ApiError::not_found());
        assert_eq!(second, Err(DoubleWrite));

        let response = writer.into_response().unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[test]
    fn test_should_merge_staged_headers() {
        let mut writer = ResponseWriter::new("req-1");
        writer
            .headers_mut()
            .insert("cache-control", http::HeaderValue::from_static("no-store"));
        writer.send_ok().unwrap();
        let response = writer.into_response().unwrap();
        assert_eq!(response.headers()["cache-control"], "no-store");
        assert_eq!(response.headers()["x-request-id"], "req-1");
    }

    #[test]
    fn test_should_record_raw_write_length() {
        let mut writer = ResponseWriter::new("req-1");
        writer
            .write(http::StatusCode::ACCEPTED, "text/plain", "queued")
            .unwrap();
        assert_eq!(writer.status(), Some(http::StatusCode::ACCEPTED));
        assert_eq!(writer.content_length(), 6);
        let response = writer.into_response().unwrap();
        assert_eq!(response.headers()["content-type"], "text/plain");
    }

    #[test]
    fn test_should_record_envelope_length() {
        let mut writer = ResponseWriter::new("req-1");
        writer.send_ok().unwrap();
        assert!(writer.content_length() > 0);
    }

    #[test]
    fn test_should_decode_json_body() {
        let ctx = context(http::Method::POST, "/api/v1/book", r#"{"name":"Dune"}"#);
        let value: serde_json::Value = ctx.decode_json().unwrap();
        assert_eq!(value["name"], "Dune");
        assert_eq!(ctx.header("x-trace"), Some("one"));
    }

    #[test]
    fn test_should_reject_empty_and_malformed_bodies() {
        let ctx = context(http::Method::POST, "/api/v1/book", "");
        let err = ctx.decode_json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.err_no, codes::DECODE_EMPTY_BODY);

        let ctx = context(http::Method::POST, "/api/v1/book", "{nope");
        let err = ctx.decode_json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.err_no, codes::DECODE_UNPARSEABLE_BODY);
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
