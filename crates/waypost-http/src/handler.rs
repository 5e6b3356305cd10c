//! Handler trait, handler shapes, and controllers.
//!
//! The routing layer decides WHICH handler serves a request; handlers decide
//! WHAT the response says. A handler returns a [`RouteResult`] and the
//! dispatcher turns it into exactly one response.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use waypost_auth::SecretKeyProvider;
use waypost_model::error::ApiError;
use waypost_model::payload::{PayloadMap, TypedPayload};

use crate::context::{RequestContext, ResponseWriter};
use crate::standard::{
    CreatePerformer, DeletePerformer, ReadPerformer, StandardCreate, StandardDelete,
    StandardRead, StandardUpdate, UpdatePerformer,
};

/// A callback that writes the response itself.
pub type CustomResponse = Box<dyn FnOnce(&RequestContext, &mut ResponseWriter) + Send>;

/// The outcome of a handler.
///
/// Exactly one of error, payloads or custom response is produced.
pub enum RouteResult {
    /// The request failed.
    Error(ApiError),
    /// The request succeeded. An empty map yields a bare "ok" envelope.
    Payloads(PayloadMap),
    /// The handler writes the response itself.
    Custom(CustomResponse),
}

impl fmt::Debug for RouteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Self::Payloads(map) => f.debug_tuple("Payloads").field(map).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl RouteResult {
    /// Success without payloads.
    #[must_use]
    pub fn ok() -> Self {
        Self::Payloads(PayloadMap::new())
    }

    /// Success carrying a single payload.
    ///
    /// A payload that cannot be serialized becomes an internal error.
    #[must_use]
    pub fn payload<P: TypedPayload>(payload: &P) -> Self {
        match PayloadMap::single(payload) {
            Ok(map) => Self::Payloads(map),
            Err(err) => Self::Error(ApiError::internal(err.to_string()).with_source(err)),
        }
    }

    /// Success carrying every payload in `payloads`.
    #[must_use]
    pub fn payloads<'a, P: TypedPayload + 'a>(payloads: impl IntoIterator<Item = &'a P>) -> Self {
        let mut map = PayloadMap::new();
        match map.extend(payloads) {
            Ok(()) => Self::Payloads(map),
            Err(err) => Self::Error(ApiError::internal(err.to_string()).with_source(err)),
        }
    }

    /// Let `respond` write the response.
    #[must_use]
    pub fn custom(respond: impl FnOnce(&RequestContext, &mut ResponseWriter) + Send + 'static) -> Self {
        Self::Custom(Box::new(respond))
    }
}

impl From<ApiError> for RouteResult {
    fn from(err: ApiError) -> Self {
        Self::Error(err)
    }
}

impl From<PayloadMap> for RouteResult {
    fn from(map: PayloadMap) -> Self {
        Self::Payloads(map)
    }
}

impl From<Result<PayloadMap, ApiError>> for RouteResult {
    fn from(result: Result<PayloadMap, ApiError>) -> Self {
        match result {
            Ok(map) => Self::Payloads(map),
            Err(err) => Self::Error(err),
        }
    }
}

/// Serves requests for one route.
#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle a request.
    async fn handle(&self, ctx: &RequestContext) -> RouteResult;
}

/// Adapts a synchronous closure into a [`RouteHandler`].
pub struct FnHandler<F>(F);

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: Fn(&RequestContext) -> RouteResult + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        (self.0)(ctx)
    }
}

/// Which of the handler shapes a route was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    /// Standard create.
    Create,
    /// Standard read.
    Read,
    /// Standard update.
    Update,
    /// Standard delete.
    Delete,
    /// Anything else.
    Custom,
}

/// A route handler tagged with its shape.
#[derive(Clone)]
pub enum Handler {
    /// Standard create handler.
    Create(Arc<dyn RouteHandler>),
    /// Standard read handler.
    Read(Arc<dyn RouteHandler>),
    /// Standard update handler.
    Update(Arc<dyn RouteHandler>),
    /// Standard delete handler.
    Delete(Arc<dyn RouteHandler>),
    /// Custom handler.
    Custom(Arc<dyn RouteHandler>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{:?}", self.shape())
    }
}

impl Handler {
    /// Wrap a create performer in the standard create flow.
    pub fn create<P: CreatePerformer>(performer: Arc<P>) -> Self {
        Self::Create(Arc::new(StandardCreate::new(performer)))
    }

    /// Wrap a read performer in the standard read flow.
    pub fn read<P: ReadPerformer>(performer: Arc<P>) -> Self {
        Self::Read(Arc::new(StandardRead::new(performer)))
    }

    /// Wrap an update performer in the standard update flow.
    pub fn update<P: UpdatePerformer>(performer: Arc<P>) -> Self {
        Self::Update(Arc::new(StandardUpdate::new(performer)))
    }

    /// Wrap a delete performer in the standard delete flow.
    pub fn delete<P: DeletePerformer>(performer: Arc<P>) -> Self {
        Self::Delete(Arc::new(StandardDelete::new(performer)))
    }

    /// A custom handler.
    pub fn custom(handler: impl RouteHandler) -> Self {
        Self::Custom(Arc::new(handler))
    }

    /// A custom handler backed by a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> RouteResult + Send + Sync + 'static,
    {
        Self::custom(FnHandler(f))
    }

    /// The shape this handler was registered with.
    #[must_use]
    pub fn shape(&self) -> HandlerShape {
        match self {
            Self::Create(_) => HandlerShape::Create,
            Self::Read(_) => HandlerShape::Read,
            Self::Update(_) => HandlerShape::Update,
            Self::Delete(_) => HandlerShape::Delete,
            Self::Custom(_) => HandlerShape::Custom,
        }
    }

    /// Run the handler.
    pub async fn invoke(&self, ctx: &RequestContext) -> RouteResult {
        let inner = match self {
            Self::Create(h) | Self::Read(h) | Self::Update(h) | Self::Delete(h) | Self::Custom(h) => {
                h
            }
        };
        inner.handle(ctx).await
    }
}

/// A named operation exposed by a controller.
///
/// Only names following the handler naming convention become routes; see
/// [`classify_operation`](crate::route::classify_operation).
#[derive(Debug, Clone)]
pub struct Operation {
    /// The operation name, e.g. `GetHandlerV1Popular`.
    pub name: String,
    /// The handler.
    pub handler: Handler,
}

impl Operation {
    /// Create an operation.
    pub fn new(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

/// A group of operations registered under one entity name.
pub trait Controller: Send + Sync + 'static {
    /// Name used in diagnostics and the route summary.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// The operations this controller exposes.
    fn operations(self: Arc<Self>) -> Vec<Operation>;

    /// Secret key lookup for the controller's authenticated routes.
    ///
    /// Registering an `Auth` operation on a controller without one fails.
    fn authenticator(&self) -> Option<Arc<dyn SecretKeyProvider>> {
        None
    }
}
