//! Convention-based HTTP routing for Waypost.
//!
//! Controllers expose named operations; operations whose names follow the
//! `[Auth]{Verb}Handler{V}{N}{Action}` convention become routes under
//! `/{base}/v{N}/{entity}[/{id}][/{action}]`. This crate provides:
//!
//! - **Endpoint parser**: turns request paths into [`Endpoint`] descriptors
//! - **Route table**: classifies operations and freezes them into a [`Router`]
//! - **Dispatcher**: parse, lookup, structural checks, authentication, hooks,
//!   handler, exactly one response
//! - **Service**: hyper `Service` implementation on top of the router
//!
//! ```
//! use std::sync::Arc;
//!
//! use waypost_http::{Controller, Handler, Operation, RouteResult, RouterBuilder};
//!
//! struct Health;
//!
//! impl Controller for Health {
//!     fn operations(self: Arc<Self>) -> Vec<Operation> {
//!         vec![Operation::new("GetHandlerV1Ping", Handler::from_fn(|_| RouteResult::ok()))]
//!     }
//! }
//!
//! let mut builder = RouterBuilder::new("/api");
//! builder.register_entity("health", Arc::new(Health)).unwrap();
//! let router = builder.build().unwrap();
//! assert_eq!(router.summary(), ["GET /api/v1/health/ping (Health.GetHandlerV1Ping, Custom)"]);
//! ```

pub mod body;
pub mod context;
pub mod endpoint;
pub mod handler;
pub mod middleware;
pub mod response;
pub mod route;
pub mod router;
pub mod service;
pub mod standard;
pub mod table;

pub use body::ResponseBody;
pub use context::{DoubleWrite, RequestContext, ResponseWriter};
pub use endpoint::{Endpoint, ParseError, parse_endpoint};
pub use handler::{
    Controller, CustomResponse, FnHandler, Handler, HandlerShape, Operation, RouteHandler,
    RouteResult,
};
pub use middleware::{AccessLogger, Flow, PostProcessor, PreHandleProcessor};
pub use route::{RouteKey, RouteRecord, RouteSpec, classify_operation};
pub use router::{Router, RouterBuilder};
pub use service::WaypostHttpService;
pub use standard::{CreatePerformer, DeletePerformer, ReadPerformer, UpdatePerformer};
pub use table::{DuplicatePolicy, RegistrationError, RouteTable};
