//! Waypost HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use waypost_model::error::ApiError;

use crate::body::ResponseBody;
use crate::response::{CONTENT_TYPE, REQUEST_ID_HEADER, error_to_response};
use crate::router::Router;

/// Hyper `Service` implementation for Waypost.
///
/// Collects the request body and hands the request to a [`Router`].
#[derive(Debug)]
pub struct WaypostHttpService {
    router: Arc<Router>,
    peer: Option<SocketAddr>,
}

impl WaypostHttpService {
    /// Create a new `WaypostHttpService`.
    pub fn new(router: Arc<Router>) -> Self {
        Self { router, peer: None }
    }

    /// A copy of this service that reports `peer` as the remote address.
    #[must_use]
    pub fn for_peer(&self, peer: SocketAddr) -> Self {
        Self {
            router: Arc::clone(&self.router),
            peer: Some(peer),
        }
    }
}

impl Clone for WaypostHttpService {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            peer: self.peer,
        }
    }
}

impl hyper::service::Service<http::Request<Incoming>> for WaypostHttpService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let router = Arc::clone(&self.router);
        let peer = self.peer;
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, &router, peer, &request_id).await;
            let response = add_common_headers(response, &request_id);
            Ok(response)
        })
    }
}

/// Process a single HTTP request through the full pipeline.
async fn process_request(
    req: http::Request<Incoming>,
    router: &Router,
    peer: Option<SocketAddr>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let (parts, incoming) = req.into_parts();

    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    router
        .dispatch(http::Request::from_parts(parts, body), peer, request_id)
        .await
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body(incoming: Incoming) -> Result<Bytes, ApiError> {
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {e}")))
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers
        .entry("content-type")
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    headers.insert("server", http::HeaderValue::from_static("Waypost"));

    response
}
