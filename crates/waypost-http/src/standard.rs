//! Standard create, read, update and delete flows.
//!
//! A controller supplies a performer with the entity-specific logic; the
//! flow around it handles body decoding, primary key checks and turning the
//! outcome into a [`RouteResult`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use waypost_model::error::{ApiError, codes};
use waypost_model::payload::{PayloadMap, TypedPayload};

use crate::context::{RequestContext, decode_body, empty_body};
use crate::handler::{RouteHandler, RouteResult};

/// Entity-specific logic of a create route.
#[async_trait]
pub trait CreatePerformer: Send + Sync + 'static {
    /// The decoded request body.
    type Request: DeserializeOwned + Send + Sync;
    /// The payload returned on success.
    type Response: TypedPayload + Send;

    /// Reject a request before anything is created.
    fn validate_create(&self, _ctx: &RequestContext, _request: &Self::Request) -> Result<(), ApiError> {
        Ok(())
    }

    /// Create the entity. `None` answers with a bare "ok".
    async fn perform_create(
        &self,
        ctx: &RequestContext,
        request: Self::Request,
    ) -> Result<Option<Self::Response>, ApiError>;
}

/// Entity-specific logic of a read route.
#[async_trait]
pub trait ReadPerformer: Send + Sync + 'static {
    /// Load the payloads the request asks for.
    async fn perform_read(&self, ctx: &RequestContext) -> Result<PayloadMap, ApiError>;
}

/// Entity-specific logic of an update route.
#[async_trait]
pub trait UpdatePerformer: Send + Sync + 'static {
    /// The decoded request body.
    type Request: DeserializeOwned + Send + Sync;
    /// The payload returned on success.
    type Response: TypedPayload + Send;

    /// Reject a request before anything is changed.
    fn validate_update(&self, _ctx: &RequestContext, _request: &Self::Request) -> Result<(), ApiError> {
        Ok(())
    }

    /// Update the entity named by the primary key.
    async fn perform_update(
        &self,
        ctx: &RequestContext,
        primary_key: i64,
        request: Self::Request,
    ) -> Result<Option<Self::Response>, ApiError>;
}

/// Entity-specific logic of a delete route.
#[async_trait]
pub trait DeletePerformer: Send + Sync + 'static {
    /// Reject a request before anything is deleted.
    fn validate_delete(&self, _ctx: &RequestContext, _primary_key: i64) -> Result<(), ApiError> {
        Ok(())
    }

    /// Delete the entity named by the primary key.
    async fn perform_delete(&self, ctx: &RequestContext, primary_key: i64) -> Result<(), ApiError>;
}

fn respond_with<P: TypedPayload>(outcome: Result<Option<P>, ApiError>) -> RouteResult {
    match outcome {
        Ok(Some(payload)) => RouteResult::payload(&payload),
        Ok(None) => RouteResult::ok(),
        Err(err) => RouteResult::Error(err),
    }
}

macro_rules! standard_flow {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        pub struct $name<P> {
            performer: Arc<P>,
        }

        impl<P> $name<P> {
            /// Wrap `performer`.
            pub fn new(performer: Arc<P>) -> Self {
                Self { performer }
            }
        }

        impl<P> fmt::Debug for $name<P> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

standard_flow!(StandardCreate, "The standard create flow.");
standard_flow!(StandardRead, "The standard read flow.");
standard_flow!(StandardUpdate, "The standard update flow.");
standard_flow!(StandardDelete, "The standard delete flow.");

#[async_trait]
impl<P: CreatePerformer> RouteHandler for StandardCreate<P> {
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        if ctx.body().is_empty() {
            return empty_body(codes::CREATE_EMPTY_BODY).into();
        }
        if ctx.endpoint().has_primary_key() {
            return ApiError::custom(
                http::StatusCode::BAD_REQUEST,
                codes::EXTRANEOUS_PRIMARY_KEY,
                "400 Bad Request: Syntax Error Cannot set primary key",
            )
            .into();
        }
        let request = match decode_body::<P::Request>(
            ctx.body(),
            codes::CREATE_EMPTY_BODY,
            codes::CREATE_UNPARSEABLE_BODY,
        ) {
            Ok(request) => request,
            Err(err) => return err.into(),
        };
        if let Err(err) = self.performer.validate_create(ctx, &request) {
            return err.into();
        }
        respond_with(self.performer.perform_create(ctx, request).await)
    }
}

#[async_trait]
impl<P: ReadPerformer> RouteHandler for StandardRead<P> {
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        self.performer.perform_read(ctx).await.into()
    }
}

#[async_trait]
impl<P: UpdatePerformer> RouteHandler for StandardUpdate<P> {
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        let primary_key = ctx.endpoint().primary_key();
        if primary_key == 0 {
            return ApiError::missing_primary_key().into();
        }
        let request = match decode_body::<P::Request>(
            ctx.body(),
            codes::UPDATE_EMPTY_BODY,
            codes::UPDATE_UNPARSEABLE_BODY,
        ) {
            Ok(request) => request,
            Err(err) => return err.into(),
        };
        if let Err(err) = self.performer.validate_update(ctx, &request) {
            return err.into();
        }
        respond_with(
            self.performer
                .perform_update(ctx, primary_key, request)
                .await,
        )
    }
}

#[async_trait]
impl<P: DeletePerformer> RouteHandler for StandardDelete<P> {
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        let primary_key = ctx.endpoint().primary_key();
        if primary_key <= 0 {
            return ApiError::missing_primary_key().into();
        }
        if let Err(err) = self.performer.validate_delete(ctx, primary_key) {
            return err.into();
        }
        match self.performer.perform_delete(ctx, primary_key).await {
            Ok(()) => RouteResult::ok(),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::endpoint::parse_endpoint;

    #[derive(Debug, Serialize, Deserialize)]
    struct Shelf {
        label: String,
    }

    impl TypedPayload for Shelf {
        const PAYLOAD_TYPE: &'static str = "shelf";
    }

    #[derive(Debug, Default)]
    struct Shelves {
        deleted: AtomicI64,
    }

    #[async_trait]
    impl CreatePerformer for Shelves {
        type Request = Shelf;
        type Response = Shelf;

        fn validate_create(&self, _ctx: &RequestContext, request: &Shelf) -> Result<(), ApiError> {
            if request.label.is_empty() {
                return Err(ApiError::bad_request("label is required"));
            }
            Ok(())
        }

        async fn perform_create(
            &self,
            _ctx: &RequestContext,
            request: Shelf,
        ) -> Result<Option<Shelf>, ApiError> {
            Ok(Some(request))
        }
    }

    #[async_trait]
    impl DeletePerformer for Shelves {
        async fn perform_delete(&self, _ctx: &RequestContext, primary_key: i64) -> Result<(), ApiError> {
            self.deleted.store(primary_key, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context(path: &str, body: &'static str) -> RequestContext {
        let (parts, ()) = http::Request::builder()
            .uri(path)
            .body(())
            .unwrap()
            .into_parts();
        let mut ctx = RequestContext::new("req", parts, Bytes::from_static(body.as_bytes()), None);
        ctx.set_endpoint(parse_endpoint(path, "/api").unwrap());
        ctx
    }

    fn error_number(result: RouteResult) -> i64 {
        match result {
            RouteResult::Error(err) => err.err_no,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_create_from_valid_body() {
        let flow = StandardCreate::new(Arc::new(Shelves::default()));
        let result = flow.handle(&context("/api/v1/shelf", r#"{"label":"sci-fi"}"#)).await;
        let RouteResult::Payloads(map) = result else {
            panic!("expected payloads");
        };
        assert_eq!(map.get::<Shelf>().unwrap()[0].label, "sci-fi");
    }

    #[tokio::test]
    async fn test_should_reject_create_body_problems_in_order() {
        let flow = StandardCreate::new(Arc::new(Shelves::default()));
        assert_eq!(
            error_number(flow.handle(&context("/api/v1/shelf/4", "")).await),
            codes::CREATE_EMPTY_BODY
        );
        assert_eq!(
            error_number(flow.handle(&context("/api/v1/shelf/4", "{}")).await),
            codes::EXTRANEOUS_PRIMARY_KEY
        );
        assert_eq!(
            error_number(flow.handle(&context("/api/v1/shelf", "[")).await),
            codes::CREATE_UNPARSEABLE_BODY
        );
        assert_eq!(
            error_number(flow.handle(&context("/api/v1/shelf", r#"{"label":""}"#)).await),
            codes::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_should_delete_by_primary_key() {
        let shelves = Arc::new(Shelves::default());
        let flow = StandardDelete::new(Arc::clone(&shelves));

        let result = flow.handle(&context("/api/v1/shelf/9", "")).await;
        assert!(matches!(result, RouteResult::Payloads(ref m) if m.is_empty()));
        assert_eq!(shelves.deleted.load(Ordering::SeqCst), 9);

        assert_eq!(
            error_number(flow.handle(&context("/api/v1/shelf/-1", "")).await),
            codes::MISSING_PRIMARY_KEY
        );
    }
}
