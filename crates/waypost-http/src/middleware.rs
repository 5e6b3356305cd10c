//! Pre-handle and post-response hooks.

use chrono::{DateTime, Local};
use tracing::info;

use crate::context::RequestContext;
use crate::handler::RouteResult;
use crate::route::RouteRecord;

/// Target the access log is emitted under.
pub const ACCESS_LOG_TARGET: &str = "waypost::access";

/// What a pre-handle hook decided.
#[derive(Debug)]
pub enum Flow {
    /// Run the next hook, then the handler.
    Continue,
    /// Skip the handler and answer with this result.
    Terminate(RouteResult),
}

/// Runs after authentication and before the handler, in registration order.
pub trait PreHandleProcessor: Send + Sync + 'static {
    /// Inspect or annotate the request, or end it early.
    fn process(&self, route: &RouteRecord, ctx: &mut RequestContext) -> Flow;
}

/// Runs after the response is produced, for every request.
pub trait PostProcessor: Send + Sync + 'static {
    /// Observe the finished request.
    fn process(&self, ctx: &RequestContext);
}

/// Logs one Common Log Format line per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogger;

impl PostProcessor for AccessLogger {
    fn process(&self, ctx: &RequestContext) {
        info!(target: ACCESS_LOG_TARGET, "{}", common_log_line(ctx, Local::now()));
    }
}

/// Format `ctx` as a Common Log Format line.
///
/// ```text
/// 127.0.0.1 - pub-1 [10/Oct/2000:13:55:36 -0700] "GET /api/v1/book/1 HTTP/1.1" 200 2326
/// ```
#[must_use]
pub fn common_log_line(ctx: &RequestContext, at: DateTime<Local>) -> String {
    let host = ctx
        .remote_addr()
        .map_or_else(|| "-".to_owned(), |addr| addr.ip().to_string());
    let user = ctx.public_key().unwrap_or("-");
    let target = ctx
        .parts()
        .uri
        .path_and_query()
        .map_or_else(|| ctx.parts().uri.path(), http::uri::PathAndQuery::as_str);
    let status = ctx.status().map_or(0, |s| s.as_u16());
    format!(
        "{host} - {user} [{}] \"{} {target} {:?}\" {status} {}",
        at.format("%d/%b/%Y:%H:%M:%S %z"),
        ctx.method(),
        ctx.parts().version,
        ctx.content_length(),
    )
}
