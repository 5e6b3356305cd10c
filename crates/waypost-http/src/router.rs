//! Router construction and request dispatch.
//!
//! Registration walks every controller's operations, keeps the ones whose
//! names follow the handler convention and freezes them into a
//! [`RouteTable`]. Dispatch then moves each request through a fixed
//! sequence of stages; the first stage that fails writes the response.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};
use waypost_auth::{AuthPolicy, authenticate};
use waypost_model::HttpVerb;
use waypost_model::error::{ApiError, ApiErrorKind, ErrorClass};

use crate::body::ResponseBody;
use crate::context::{DoubleWrite, RequestContext, ResponseWriter};
use crate::endpoint::{Endpoint, parse_endpoint};
use crate::handler::{Controller, RouteResult};
use crate::middleware::{Flow, PostProcessor, PreHandleProcessor};
use crate::response::error_to_response;
use crate::route::{RouteRecord, classify_operation};
use crate::table::{DuplicatePolicy, RegistrationError, RouteTable};

/// Collects controllers and hooks, then builds a [`Router`].
pub struct RouterBuilder {
    base_path: String,
    duplicate_policy: DuplicatePolicy,
    auth_policy: AuthPolicy,
    table: RouteTable,
    pre_processors: Vec<Arc<dyn PreHandleProcessor>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("base_path", &self.base_path)
            .field("duplicate_policy", &self.duplicate_policy)
            .field("auth_policy", &self.auth_policy)
            .field("routes", &self.table.len())
            .field("pre_processors", &self.pre_processors.len())
            .field("post_processors", &self.post_processors.len())
            .finish()
    }
}

impl RouterBuilder {
    /// Start a router serving paths under `base_path`.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            duplicate_policy: DuplicatePolicy::default(),
            auth_policy: AuthPolicy::default(),
            table: RouteTable::new(),
            pre_processors: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    /// Set how colliding registrations are handled.
    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set extra checks applied during signature verification.
    #[must_use]
    pub fn auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    /// Append a pre-handle hook.
    #[must_use]
    pub fn pre_processor(mut self, processor: impl PreHandleProcessor) -> Self {
        self.pre_processors.push(Arc::new(processor));
        self
    }

    /// Append a post-response hook.
    #[must_use]
    pub fn post_processor(mut self, processor: impl PostProcessor) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    /// Register every conventionally named operation of `controller` under
    /// `entity`.
    ///
    /// Returns the number of routes added.
    pub fn register_entity<C: Controller>(
        &mut self,
        entity: &str,
        controller: Arc<C>,
    ) -> Result<usize, RegistrationError> {
        if entity.is_empty() || entity.contains('/') {
            return Err(RegistrationError::InvalidEntityName(entity.to_owned()));
        }
        let entity = entity.to_lowercase();
        let controller_name = controller.name().to_owned();
        let authenticator = controller.authenticator();

        let mut added = 0;
        for operation in Arc::clone(&controller).operations() {
            let Some(spec) = classify_operation(&operation.name) else {
                debug!(
                    controller = %controller_name,
                    operation = %operation.name,
                    "skipping operation that is not a handler"
                );
                continue;
            };
            if spec.requires_auth && authenticator.is_none() {
                return Err(RegistrationError::MissingAuthenticator {
                    controller: controller_name,
                    operation: operation.name,
                });
            }

            let path = if spec.action.is_empty() {
                entity.clone()
            } else {
                format!("{entity}/{}", spec.action)
            };
            let record = RouteRecord {
                verb: spec.verb,
                path,
                version: spec.version,
                version_token: spec.version_token,
                entity: entity.clone(),
                action: spec.action,
                requires_auth: spec.requires_auth,
                authenticator: if spec.requires_auth {
                    authenticator.clone()
                } else {
                    None
                },
                handler: operation.handler,
                handler_name: operation.name,
                controller_name: controller_name.clone(),
            };
            if let Some(replaced) = self.table.insert(record, self.duplicate_policy)? {
                warn!(
                    route = %replaced.key(),
                    replaced = %replaced.handler_name,
                    "route registration replaced an earlier handler"
                );
            }
            added += 1;
        }

        debug!(entity = %entity, controller = %controller_name, routes = added, "registered entity");
        Ok(added)
    }

    /// Freeze the table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::NoRoutes`] if nothing was registered.
    pub fn build(self) -> Result<Router, RegistrationError> {
        if self.table.is_empty() {
            return Err(RegistrationError::NoRoutes);
        }
        Ok(Router {
            base_path: self.base_path,
            auth_policy: self.auth_policy,
            table: self.table,
            pre_processors: self.pre_processors,
            post_processors: self.post_processors,
        })
    }
}

/// A frozen route table plus the dispatch pipeline.
pub struct Router {
    base_path: String,
    auth_policy: AuthPolicy,
    table: RouteTable,
    pre_processors: Vec<Arc<dyn PreHandleProcessor>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("auth_policy", &self.auth_policy)
            .field("routes", &self.table.len())
            .field("pre_processors", &self.pre_processors.len())
            .field("post_processors", &self.post_processors.len())
            .finish()
    }
}

impl Router {
    /// The API base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Sorted listing of every route.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        self.table.summary(&self.base_path)
    }

    /// Log the route summary at info level.
    pub fn log_summary(&self) {
        for line in self.summary() {
            info!(target: "waypost::routes", "{line}");
        }
    }

    /// Dispatch a request with a freshly generated request id.
    pub async fn handle(&self, request: http::Request<Bytes>) -> http::Response<ResponseBody> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.dispatch(request, None, &request_id).await
    }

    /// Dispatch a request.
    ///
    /// Always yields exactly one response. Post-processors run after it is
    /// produced, whatever the outcome.
    pub async fn dispatch(
        &self,
        request: http::Request<Bytes>,
        remote_addr: Option<SocketAddr>,
        request_id: &str,
    ) -> http::Response<ResponseBody> {
        let (parts, body) = request.into_parts();
        let mut ctx = RequestContext::new(request_id, parts, body, remote_addr);
        let mut writer = ResponseWriter::new(request_id);

        let result = self.route(&mut ctx).await;
        if let Err(err) = write_result(result, &ctx, &mut writer) {
            error!(request_id = %request_id, error = %err, "dispatcher wrote twice");
        }

        let content_length = writer.content_length();
        let response = writer.into_response().unwrap_or_else(|| {
            error!(request_id = %request_id, "no response was written");
            error_to_response(&ApiError::new(ApiErrorKind::EmptyResponse), request_id)
        });
        ctx.record_response(response.status(), content_length);

        for processor in &self.post_processors {
            processor.process(&ctx);
        }
        response
    }

    /// Run every stage up to and including the handler.
    async fn route(&self, ctx: &mut RequestContext) -> RouteResult {
        // 1. Parse the path.
        let endpoint = match parse_endpoint(ctx.parts().uri.path(), &self.base_path) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                if err.class() == ErrorClass::Server {
                    error!(request_id = %ctx.request_id(), error = %err, "endpoint parse failed");
                } else {
                    debug!(request_id = %ctx.request_id(), error = %err, "path is not routable");
                }
                return err.to_api_error().into();
            }
        };
        ctx.set_endpoint(endpoint);

        // 2. Look up the route.
        let Some(route) = self.lookup(ctx.method(), ctx.endpoint()) else {
            debug!(
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                path = %ctx.parts().uri.path(),
                "no route"
            );
            return ApiError::not_found().into();
        };

        // 3. Check the path shape against the verb.
        if let Err(err) = check_structure(route.verb, ctx.endpoint()) {
            return err.into();
        }

        // 4. Authenticate.
        ctx.set_public_key(None);
        if route.requires_auth {
            let Some(authenticator) = route.authenticator.as_deref() else {
                return ApiError::internal(format!(
                    "route {} requires auth but has no authenticator",
                    route.key()
                ))
                .into();
            };
            match authenticate(ctx.parts(), authenticator, &self.auth_policy) {
                Ok(auth) => ctx.set_public_key(Some(auth.public_key)),
                Err(err) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        code = err.code(),
                        error = %err,
                        "authentication failed"
                    );
                    return ApiError::forbidden().into();
                }
            }
        }

        // 5. Pre-handle hooks.
        for processor in &self.pre_processors {
            if let Flow::Terminate(result) = processor.process(route, ctx) {
                debug!(request_id = %ctx.request_id(), "pre-handle hook ended the request");
                return result;
            }
        }

        // 6. Handler.
        debug!(
            request_id = %ctx.request_id(),
            controller = %route.controller_name,
            handler = %route.handler_name,
            "dispatching"
        );
        route.handler.invoke(ctx).await
    }

    fn lookup(&self, method: &http::Method, endpoint: &Endpoint) -> Option<&RouteRecord> {
        let verb = HttpVerb::from_method(method)?;
        self.table.lookup(
            verb,
            endpoint.version_token(),
            endpoint.entity(),
            endpoint.action(),
        )
    }
}

/// Reject paths whose shape does not fit the verb.
///
/// A create carries no primary key; reads and updates need one unless the
/// route has an action.
fn check_structure(verb: HttpVerb, endpoint: &Endpoint) -> Result<(), ApiError> {
    match verb {
        HttpVerb::Post if endpoint.has_primary_key() && endpoint.extras().len() == 1 => {
            Err(ApiError::extraneous_primary_key())
        }
        HttpVerb::Get | HttpVerb::Put | HttpVerb::Patch
            if !endpoint.has_primary_key() && endpoint.extras().is_empty() =>
        {
            Err(ApiError::missing_primary_key())
        }
        _ => Ok(()),
    }
}

/// Turn a handler outcome into the response.
fn write_result(
    result: RouteResult,
    ctx: &RequestContext,
    writer: &mut ResponseWriter,
) -> Result<(), DoubleWrite> {
    match result {
        RouteResult::Error(err) => {
            if err.class() == ErrorClass::Server {
                error!(
                    request_id = %ctx.request_id(),
                    err_no = err.err_no,
                    detail = err.debug_message.as_deref().unwrap_or_default(),
                    "request failed"
                );
            }
            writer.send_error(&err)
        }
        RouteResult::Payloads(payloads) if payloads.is_empty() => writer.send_ok(),
        RouteResult::Payloads(payloads) => writer.send_payloads(payloads),
        RouteResult::Custom(respond) => {
            respond(ctx, writer);
            if writer.is_written() {
                Ok(())
            } else {
                error!(request_id = %ctx.request_id(), "custom response wrote nothing");
                writer.send_error(&ApiError::new(ApiErrorKind::EmptyResponse))
            }
        }
    }
}
